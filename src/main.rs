#![warn(clippy::unwrap_used)]

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use asaprint::color::RgbColor;
use asaprint::configuration::{Configuration, LineNumbering, PageNumbering, POINTS_PER_INCH};
use asaprint::error::ContextError;
use clap::Parser;

/// Converts text files with ASA carriage control to PDF.
#[derive(Parser, Debug)]
#[command(version, long_about = None, disable_version_flag = true)]
struct CliArguments {
    #[arg(short = 'A', value_name = "0|1", help = "Interpret the first character of each line as ASA carriage control (1) or print lines as they come (0)")]
    asa: Option<i64>,
    #[arg(short = 'H', value_name = "units", help = "Page height")]
    page_height: Option<f32>,
    #[arg(short = 'W', value_name = "units", help = "Page width")]
    page_width: Option<f32>,
    #[arg(short = 'u', value_name = "multiplier", help = "Page units per unit of the dimension options, 72 for inches")]
    unit_multiplier: Option<f32>,
    #[arg(short = 'M', value_name = "side+units", help = "Margin, the side is one of A (all), T, B, L and R, e.g. -MT0.5")]
    margins: Vec<String>,
    #[arg(short = 'l', value_name = "count", help = "Lines per page")]
    lines_per_page: Option<f32>,
    #[arg(short = 'g', value_name = "RRGGBB", value_parser = RgbColor::from_hex_str, help = "Colour of the bands")]
    bar_color: Option<RgbColor>,
    #[arg(short = 'i', value_name = "lines", allow_negative_numbers = true, help = "Height of the bands in lines")]
    shade_step: Option<i32>,
    #[arg(short = 'd', value_name = "pattern", help = "Dash pattern of the band rules, e.g. \"2 4\", bands are filled when empty")]
    dash_pattern: Option<String>,
    #[arg(short = '1', value_name = "font", help = "Body font")]
    body_font: Option<String>,
    #[arg(short = '2', value_name = "font", help = "Heading font, used for line numbers and labels")]
    heading_font: Option<String>,
    #[arg(short = 'o', value_name = "RRGGBB", value_parser = RgbColor::from_hex_str, help = "Colour of overprinted lines")]
    overstrike_color: Option<RgbColor>,
    #[arg(short = 'n', value_name = "RRGGBB", value_parser = RgbColor::from_hex_str, help = "Colour of the line numbers, enables line numbering")]
    line_number_color: Option<RgbColor>,
    #[arg(short = 'N', value_name = "0|1", help = "Enables line numbering, restarting on every page (1) or running through the document (0)")]
    per_page_line_numbers: Option<i64>,
    #[arg(short = 't', value_name = "RRGGBB", value_parser = RgbColor::from_hex_str, help = "Colour of the titles and page labels")]
    title_color: Option<RgbColor>,
    #[arg(short = 'P', help = "Print page numbers at the top of the pages")]
    page_numbers_top: bool,
    #[arg(short = 'p', help = "Print page numbers at the bottom of the pages")]
    page_numbers_bottom: bool,
    #[arg(short = 'R', value_name = "text", help = "Title printed in the top right margin")]
    right_title: Option<String>,
    #[arg(short = 'L', value_name = "text", help = "Title printed in the top left margin")]
    left_title: Option<String>,
    #[arg(short = 'T', value_name = "text", help = "Banner printed across the top of every page")]
    banner: Option<String>,
    #[arg(short = 'X', short_alias = 'x', help = "Print the resolved configuration as JSON and exit")]
    show_configuration: bool,
    #[arg(short = 'v', action = clap::ArgAction::Version, help = "Print version")]
    version: Option<bool>,
    #[arg(long = "input", value_name = "file_path", help = "Input file, standard input when omitted")]
    input_file_path: Option<PathBuf>,
    #[arg(long = "output", value_name = "file_path", help = "Output file, standard output when omitted")]
    output_file_path: Option<PathBuf>,
    #[arg(long = "configuration", value_name = "json_file", help = "Configuration file in the JSON format")]
    configuration_file_path: Option<PathBuf>,
    #[arg(long = "verbose", help = "Log the progress of the conversion")]
    verbose: bool,
    #[arg(value_name = "ignored", hide = true)]
    ignored_arguments: Vec<String>,
}

fn main() {
    let arguments = CliArguments::parse();
    let default_filter = if arguments.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(error) = fallible_main(arguments) {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main(arguments: CliArguments) -> Result<(), ContextError> {
    log::debug!("{:?}", arguments);
    for ignored_argument in &arguments.ignored_arguments {
        log::warn!("Ignoring the non-option argument {:?}", ignored_argument);
    }

    let configuration =
        resolve_configuration(&arguments, |name| std::env::var(name).ok())?.validated()?;
    if arguments.show_configuration {
        let settings = serde_json::to_string_pretty(&configuration).map_err(|error| {
            ContextError::with_error("Failed to serialize the configuration", &error)
        })?;
        eprintln!("{}", settings);
        return Ok(());
    }

    let input: Box<dyn BufRead> = match &arguments.input_file_path {
        Some(input_file_path) => Box::new(BufReader::new(
            std::fs::File::open(input_file_path).map_err(|error| {
                ContextError::with_error(
                    format!("Failed to open the input file {:?}", input_file_path),
                    &error,
                )
            })?,
        )),
        None => Box::new(std::io::stdin().lock()),
    };
    let output: Box<dyn Write> = match &arguments.output_file_path {
        Some(output_file_path) => Box::new(BufWriter::new(
            std::fs::File::create(output_file_path).map_err(|error| {
                ContextError::with_error(
                    format!("Failed to create the output file {:?}", output_file_path),
                    &error,
                )
            })?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    let (_, summary) = asaprint::convert(input, output, &configuration)?;
    match &arguments.output_file_path {
        Some(output_file_path) => log::info!(
            "Saved {} pages to the path: {:?}",
            summary.pages,
            output_file_path
        ),
        None => log::info!("Wrote {} pages to the standard output", summary.pages),
    }

    Ok(())
}

/// Layers the configuration file, the environment and the options, in this order.
fn resolve_configuration<F>(
    arguments: &CliArguments,
    lookup: F,
) -> Result<Configuration, ContextError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut configuration = match &arguments.configuration_file_path {
        Some(configuration_file_path) => Configuration::from_path(configuration_file_path)?,
        None => Configuration::default(),
    };
    configuration.seed_from_environment(lookup);

    // The multiplier applies to every dimension, wherever it appears on the command line
    let unit = arguments.unit_multiplier.unwrap_or(POINTS_PER_INCH);
    if let Some(asa) = arguments.asa {
        configuration.asa = asa == 1;
    }

    let layout = &mut configuration.layout;
    if let Some(page_height) = arguments.page_height {
        layout.page_height = page_height * unit;
    }
    if let Some(page_width) = arguments.page_width {
        layout.page_width = page_width * unit;
    }
    if let Some(lines_per_page) = arguments.lines_per_page {
        layout.lines_per_page = lines_per_page;
    }
    for margin in &arguments.margins {
        configuration.apply_margin(margin, unit)?;
    }

    let style = &mut configuration.style;
    if let Some(bar_color) = arguments.bar_color {
        style.bar_color = bar_color;
    }
    if let Some(shade_step) = arguments.shade_step {
        style.shade_step = shade_step;
    }
    if let Some(dash_pattern) = &arguments.dash_pattern {
        style.dash_pattern = dash_pattern.clone();
    }
    if let Some(body_font) = &arguments.body_font {
        style.body_font = body_font.clone();
    }
    if let Some(heading_font) = &arguments.heading_font {
        style.heading_font = heading_font.clone();
    }
    if let Some(overstrike_color) = arguments.overstrike_color {
        style.overstrike_color = overstrike_color;
    }
    if let Some(title_color) = arguments.title_color {
        style.title_color = title_color;
    }
    if let Some(line_number_color) = arguments.line_number_color {
        style.line_number_color = line_number_color;
        if style.line_numbering == LineNumbering::Off {
            style.line_numbering = LineNumbering::PerPage;
        }
    }
    if let Some(per_page) = arguments.per_page_line_numbers {
        style.line_numbering = if per_page == 1 {
            LineNumbering::PerPage
        } else {
            LineNumbering::Running
        };
    }
    if arguments.page_numbers_top {
        style.page_numbering = PageNumbering::Top;
    } else if arguments.page_numbers_bottom {
        style.page_numbering = PageNumbering::Bottom;
    }
    if let Some(right_title) = &arguments.right_title {
        style.right_title = right_title.clone();
    }
    if let Some(left_title) = &arguments.left_title {
        style.left_title = left_title.clone();
    }
    if let Some(banner) = &arguments.banner {
        style.banner = banner.clone();
    }

    Ok(configuration)
}

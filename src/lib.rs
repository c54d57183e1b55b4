//! asaprint converts line printer listings into PDF documents.
//!
//! The input is read line by line. In ASA mode the first character of every line is a
//! carriage-control code (`1` for a new page, `0` for double spacing, `+` to overprint
//! the previous line and a few colour extensions), otherwise lines are printed as they
//! come with form feeds and carriage returns honoured. Pages are decorated like the
//! continuous stationery the listings were meant for: shaded bands behind the text,
//! optional titles, page labels, line numbers and a banner.
//!
//! The output is produced in a single pass and never revisited, so it can be written
//! to a pipe. It is byte-for-byte reproducible: there are no timestamps and no document
//! identifiers, and every number is rendered the same way on every run.
//!
//! The entry point is [`convert`], which takes a [`configuration::Configuration`], an
//! input and an output.

/// The carriage-control codes and the translation of input lines into text operators.
pub mod carriage;

/// The fill colours used for the text, the bands and the labels.
pub mod color;

/// The `Configuration` type, its JSON representation, the environment variables that
/// seed it and the checks it goes through before a conversion starts.
///
/// All the geometry is expressed in page units of 1/72 inch. The derived `Layout`
/// carries the quantities computed from it, such as the line height.
pub mod configuration;

mod decoration;

/// The module where the conversion is driven, from the header of the document to its
/// trailer.
///
/// A `Document` owns the output and every piece of state of a conversion. Its
/// `translate` method reads the whole input, opening and closing pages as the lines
/// demand, and `finish` writes the objects shared by all the pages together with the
/// cross-reference table.
pub mod document;

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// The `ContextError` type is always returned from a `Result` type, which means that the end user can expect
/// to obtain an explanation whenever a function returns an error. If an error happened in a function which
/// was called inside a function of this library, then the user can expect to also obtain information about
/// this propagated error.
pub mod error;

/// The renderings of the numbers written into the content streams.
pub mod numbers;

mod page;

/// The append-only output of a conversion, aware of its own position.
pub mod pdf;

/// The list of finished pages, written once as the kids of the page tree.
pub mod registry;

/// Object numbers and the cross-reference table mapping them to byte offsets.
pub mod xref;

pub use document::{convert, ConversionSummary, Document};
pub use error::ContextError;

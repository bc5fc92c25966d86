//! Form body parsing collaborator.
//!
//! The request hands its body to a [`FormParser`] the first time post data or
//! uploaded files are requested. [`UrlEncodedFormParser`] covers
//! `application/x-www-form-urlencoded`; applications that accept multipart
//! uploads plug in their own parser.

use std::{collections::BTreeMap, fmt};

use bytes::Bytes;
use encoding_rs::Encoding;
use thiserror::Error;

use super::{content_type::ContentType, query::QueryDict};

/// Media type handled by [`UrlEncodedFormParser`].
pub const URL_ENCODED: &str = "application/x-www-form-urlencoded";

/// An uploaded file held in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-supplied file name.
    pub file_name: String,
    /// Declared media type of the part.
    pub content_type: String,
    /// File contents.
    pub content: Bytes,
}

/// Uploaded files keyed by form field name.
pub type Files = BTreeMap<String, Vec<UploadedFile>>;

/// Fields and files parsed from a form body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostData {
    /// Non-file form fields.
    pub fields: QueryDict,
    /// Uploaded files.
    pub files: Files,
}

/// Input handed to a [`FormParser`].
#[derive(Clone, Copy, Debug)]
pub struct FormInput<'a> {
    /// Raw request body.
    pub body: &'a [u8],
    /// Parsed `Content-Type` header.
    pub content_type: &'a ContentType,
    /// Encoding used to decode text fields.
    pub encoding: &'static Encoding,
}

/// Errors raised while parsing a form body.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum FormError {
    /// The body contained more fields than allowed.
    #[error("form has {count} fields, more than the limit of {limit}")]
    TooManyFields {
        /// Number of fields found.
        count: usize,
        /// Configured maximum.
        limit: usize,
    },
    /// The body could not be parsed.
    #[error("malformed form body: {0}")]
    Malformed(String),
}

/// Turns a request body into post fields and files.
pub trait FormParser: fmt::Debug + Send + Sync {
    /// Parse `input`.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] when the body cannot be interpreted.
    fn parse(&self, input: FormInput<'_>) -> Result<PostData, FormError>;
}

/// Parser for url-encoded form bodies.
///
/// Bodies of any other media type yield empty post data.
#[derive(Clone, Copy, Debug, Default)]
pub struct UrlEncodedFormParser {
    max_fields: Option<usize>,
}

impl UrlEncodedFormParser {
    /// Parser rejecting bodies with more than `limit` fields.
    #[must_use]
    pub const fn with_max_fields(limit: usize) -> Self {
        Self {
            max_fields: Some(limit),
        }
    }
}

impl FormParser for UrlEncodedFormParser {
    fn parse(&self, input: FormInput<'_>) -> Result<PostData, FormError> {
        if !input
            .content_type
            .media_type
            .eq_ignore_ascii_case(URL_ENCODED)
        {
            if !input.body.is_empty() {
                log::debug!(
                    "no form parser for body: content_type={}",
                    input.content_type.media_type
                );
            }
            return Ok(PostData::default());
        }

        if let Some(limit) = self.max_fields {
            let count = QueryDict::count_fields(input.body);
            if count > limit {
                return Err(FormError::TooManyFields { count, limit });
            }
        }

        Ok(PostData {
            fields: QueryDict::parse(input.body, input.encoding.output_encoding()),
            files: Files::new(),
        })
    }
}

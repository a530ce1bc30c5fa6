use std::path::Path;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Only .gr files are accepted.")]
    WrongExtension { file_name: String },
    #[error("`{file_name}` is not a text file.")]
    NotText { file_name: String },
}

impl UploadError {
    /// Short heading for a notification.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::WrongExtension { .. } => "Wrong file type",
            Self::NotText { .. } => "Unreadable file",
        }
    }
}

/// Checks that an uploaded file looks like a `.gr` graph before any parsing.
///
/// # Errors
/// Returns an error unless the name ends in `.gr` and the bytes are UTF-8 text
/// without NUL bytes.
pub fn validate_upload<'a>(file_name: &str, bytes: &'a [u8]) -> Result<&'a str, UploadError> {
    let is_gr = Path::new(file_name)
        .extension()
        .is_some_and(|extension| extension == "gr");
    if !is_gr {
        return Err(UploadError::WrongExtension {
            file_name: file_name.to_owned(),
        });
    }
    std::str::from_utf8(bytes)
        .ok()
        .filter(|text| !text.contains('\0'))
        .ok_or_else(|| UploadError::NotText {
            file_name: file_name.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{UploadError, validate_upload};

    #[rstest]
    #[case("graph.gr", b"p tw 1 0\n".as_slice(), true)]
    #[case("dir.d/graph.gr", b"1 2\n".as_slice(), true)]
    #[case("graph.td", b"1 2\n".as_slice(), false)]
    #[case("graph.GR.txt", b"1 2\n".as_slice(), false)]
    #[case("gr", b"1 2\n".as_slice(), false)]
    #[case("graph.gr", b"\xff\xfe".as_slice(), false)]
    #[case("graph.gr", b"1 2\0".as_slice(), false)]
    fn accepts_only_gr_text(#[case] name: &str, #[case] bytes: &[u8], #[case] accepted: bool) {
        assert_eq!(validate_upload(name, bytes).is_ok(), accepted);
    }

    #[test]
    fn wrong_extension_message() {
        let err = validate_upload("a.png", b"").unwrap_err();
        assert_eq!(err.title(), "Wrong file type");
        assert_eq!(err.to_string(), "Only .gr files are accepted.");
        assert!(matches!(err, UploadError::WrongExtension { .. }));
    }
}

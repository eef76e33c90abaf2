//! Minimal `multipart/form-data` encoder for the upload request.

/// An in-memory multipart body.
pub(crate) struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub(crate) fn new() -> Self {
        Self::with_boundary(format!("----dancecoach{:016x}", rand::random::<u64>()))
    }

    pub(crate) fn with_boundary(boundary: String) -> Self {
        Self {
            boundary,
            body: Vec::new(),
        }
    }

    /// Append a plain text field.
    pub(crate) fn text(&mut self, name: &str, value: &str) -> &mut Self {
        self.open_part(&format!(
            "Content-Disposition: form-data; name=\"{}\"\r\n",
            escape_quoted(name)
        ));
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Append a file field.
    pub(crate) fn file(
        &mut self,
        name: &str,
        file_name: &str,
        content_type: &str,
        contents: &[u8],
    ) -> &mut Self {
        self.open_part(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {content_type}\r\n",
            escape_quoted(name),
            escape_quoted(file_name)
        ));
        self.body.extend_from_slice(contents);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Value for the request `Content-Type` header.
    pub(crate) fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Close the form and return the encoded body.
    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }

    fn open_part(&mut self, headers: &str) {
        self.body
            .extend_from_slice(format!("--{}\r\n{headers}\r\n", self.boundary).as_bytes());
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .chars()
        .filter(|ch| *ch != '\r' && *ch != '\n')
        .map(|ch| match ch {
            '"' => "%22".to_string(),
            other => other.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_text_and_file_parts() {
        let mut form = MultipartForm::with_boundary("XYZ".to_string());
        form.text("difficulty", "beginner")
            .file("user", "me.mp4", "video/mp4", b"\x00\x01");
        assert_eq!(form.content_type(), "multipart/form-data; boundary=XYZ");
        let body = form.finish();
        let mut expected = Vec::new();
        expected.extend_from_slice(
            b"--XYZ\r\nContent-Disposition: form-data; name=\"difficulty\"\r\n\r\nbeginner\r\n",
        );
        expected.extend_from_slice(
            b"--XYZ\r\nContent-Disposition: form-data; name=\"user\"; filename=\"me.mp4\"\r\nContent-Type: video/mp4\r\n\r\n\x00\x01\r\n",
        );
        expected.extend_from_slice(b"--XYZ--\r\n");
        assert_eq!(body, expected);
    }

    #[test]
    fn file_names_cannot_break_out_of_headers() {
        let mut form = MultipartForm::with_boundary("B".to_string());
        form.file("original", "evil\"\r\nX: y.mp4", "video/mp4", b"");
        let body = String::from_utf8(form.finish()).unwrap();
        assert!(body.contains("filename=\"evil%22X: y.mp4\""));
    }
}

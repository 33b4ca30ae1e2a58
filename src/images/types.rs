/// Supported image content types
///
/// A closed allow list. Each variant carries its MIME type and the file
/// extension used for the stored blob. The declared MIME is the trust
/// boundary; bytes are not inspected.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Jpeg,
    Jpg,
    Png,
    Webp,
}

impl ImageType {
    /// Canonical name, also the database representation
    pub fn canonical_name(&self) -> &'static str {
        match self {
            ImageType::Jpeg => "JPEG",
            ImageType::Jpg => "JPG",
            ImageType::Png => "PNG",
            ImageType::Webp => "WEBP",
        }
    }

    /// MIME type used when serving the blob back
    pub fn mime(&self) -> &'static str {
        match self {
            ImageType::Jpeg => "image/jpeg",
            ImageType::Jpg => "image/jpg",
            ImageType::Png => "image/png",
            ImageType::Webp => "image/webp",
        }
    }

    /// Extension appended to the generated stored name
    pub fn extension(&self) -> &'static str {
        match self {
            ImageType::Jpeg => ".jpeg",
            ImageType::Jpg => ".jpg",
            ImageType::Png => ".png",
            ImageType::Webp => ".webp",
        }
    }

    /// Find a type by declared MIME, matched case-insensitively.
    ///
    /// Returns `None` when the MIME is absent or not on the allow list.
    pub fn from_mime(mime: Option<&str>) -> Option<Self> {
        let mime = mime?;
        [ImageType::Jpeg, ImageType::Jpg, ImageType::Png, ImageType::Webp]
            .into_iter()
            .find(|t| t.mime().eq_ignore_ascii_case(mime))
    }

    /// Decode the database representation
    pub fn from_canonical_name(name: &str) -> Option<Self> {
        match name {
            "JPEG" => Some(ImageType::Jpeg),
            "JPG" => Some(ImageType::Jpg),
            "PNG" => Some(ImageType::Png),
            "WEBP" => Some(ImageType::Webp),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_allow_listed_mimes() {
        assert_eq!(ImageType::from_mime(Some("image/png")), Some(ImageType::Png));
        assert_eq!(ImageType::from_mime(Some("image/jpeg")), Some(ImageType::Jpeg));
        assert_eq!(ImageType::from_mime(Some("image/jpg")), Some(ImageType::Jpg));
        assert_eq!(ImageType::from_mime(Some("image/webp")), Some(ImageType::Webp));
    }

    #[test]
    fn mime_match_is_case_insensitive() {
        assert_eq!(ImageType::from_mime(Some("IMAGE/PNG")), Some(ImageType::Png));
        assert_eq!(ImageType::from_mime(Some("Image/WebP")), Some(ImageType::Webp));
    }

    #[test]
    fn rejects_unknown_and_missing_mimes() {
        assert_eq!(ImageType::from_mime(Some("image/gif")), None);
        assert_eq!(ImageType::from_mime(Some("application/pdf")), None);
        assert_eq!(ImageType::from_mime(None), None);
    }

    #[test]
    fn canonical_names_round_trip() {
        for t in [ImageType::Jpeg, ImageType::Jpg, ImageType::Png, ImageType::Webp] {
            assert_eq!(ImageType::from_canonical_name(t.canonical_name()), Some(t));
        }
        assert_eq!(ImageType::from_canonical_name("GIF"), None);
    }

    #[test]
    fn extensions_match_variants() {
        assert_eq!(ImageType::Png.extension(), ".png");
        assert_eq!(ImageType::Webp.extension(), ".webp");
    }
}

// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};

use crate::common::i18n::DEFAULT_LANG;

// Extrator de idioma a partir do Accept-Language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(|header_str| {
                accept_language::parse(header_str)
                    .first() // Pega o idioma de maior peso (ex: "pt-BR")
                    .map(|tag| {
                        // "pt-BR" -> "pt"
                        tag.split('-').next().unwrap_or(tag).to_lowercase()
                    })
            })
            .filter(|lang| !lang.is_empty())
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Locale::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn picks_primary_subtag_of_preferred_language() {
        let locale = Locale::from_headers(&headers_with("pt-BR,pt;q=0.9,en;q=0.8"));
        assert_eq!(locale.0, "pt");
    }

    #[test]
    fn respects_quality_weights() {
        let locale = Locale::from_headers(&headers_with("en;q=0.3, pt-PT;q=0.9"));
        assert_eq!(locale.0, "pt");
    }

    #[test]
    fn falls_back_to_default_without_header() {
        assert_eq!(Locale::from_headers(&HeaderMap::new()), Locale::default());
    }
}

use std::path::Path;

use axum::{
    extract::{Multipart, multipart::MultipartError},
    http::StatusCode,
};
use tracing::warn;

use crate::{
    catalog::{MovieInput, slugify},
    error::AppResult,
    models::{MovieStatus, parse_cents},
    upload::{UploadError, store_poster},
};

/// Raw text of the admin movie form, as typed. Kept so the form can be
/// re-rendered with the user's input after a validation error.
#[derive(Clone, Debug, Default)]
pub struct MovieForm {
    pub title: String,
    pub description: String,
    pub price: String,
    pub release_year: String,
    pub duration: String,
    pub rating: String,
    pub trailer_url: String,
    pub poster_url: String,
    pub active: bool,
    pub category_ids: Vec<i32>,
    pub poster_file: Option<PosterFile>,
    /// The body hit the upload limit. Fields after that point were not read.
    pub oversized: bool,
}

#[derive(Clone, Debug)]
pub struct PosterFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum MovieFormError {
    #[error("{}", .0.join(" "))]
    Invalid(Vec<String>),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl MovieFormError {
    pub fn messages(&self) -> Vec<String> {
        match self {
            MovieFormError::Invalid(errors) => errors.clone(),
            MovieFormError::Upload(err) => vec![err.to_string()],
        }
    }
}

impl MovieForm {
    pub fn from_movie(m: &crate::entities::movie::Model, category_ids: Vec<i32>) -> Self {
        Self {
            title: m.title.clone(),
            description: m.description.clone(),
            price: crate::models::format_cents(m.price_cents),
            release_year: m.release_year.to_string(),
            duration: m.duration.to_string(),
            rating: m.rating.to_string(),
            trailer_url: m.trailer_url.clone().unwrap_or_default(),
            poster_url: m.poster_url.clone().unwrap_or_default(),
            active: m.status == MovieStatus::Active,
            category_ids,
            poster_file: None,
            oversized: false,
        }
    }

    /// Collects the multipart body. An empty file part means no upload. A body
    /// over the size limit stops reading and marks the form `oversized`.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = MovieForm::default();

        loop {
            match form.read_field(&mut multipart).await {
                Ok(true) => {},
                Ok(false) => break,
                Err(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                    warn!(error = %err, "movie form body over the upload limit");
                    form.oversized = true;
                    break;
                },
                Err(err) => return Err(err.into()),
            }
        }

        Ok(form)
    }

    async fn read_field(&mut self, multipart: &mut Multipart) -> Result<bool, MultipartError> {
        let Some(field) = multipart.next_field().await? else {
            return Ok(false);
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "poster" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if !file_name.is_empty() && !bytes.is_empty() {
                    self.poster_file = Some(PosterFile { file_name, bytes: bytes.to_vec() });
                }
            },
            "categories" => {
                if let Ok(id) = field.text().await?.trim().parse() {
                    self.category_ids.push(id);
                }
            },
            "status" => {
                field.text().await?;
                self.active = true;
            },
            _ => {
                let value = field.text().await?;
                match name.as_str() {
                    "title" => self.title = value,
                    "description" => self.description = value,
                    "price" => self.price = value,
                    "release_year" => self.release_year = value,
                    "duration" => self.duration = value,
                    "rating" => self.rating = value,
                    "trailer_url" => self.trailer_url = value,
                    "poster_url" => self.poster_url = value,
                    _ => {},
                }
            },
        }
        Ok(true)
    }

    /// Checks every field and returns the typed input. The poster is left
    /// unset; see [`MovieForm::resolve_poster`].
    pub fn validate(&self, current_year: i32) -> Result<MovieInput, MovieFormError> {
        let mut errors = Vec::new();

        let title = self.title.trim();
        let description = self.description.trim();
        if title.is_empty() {
            errors.push("Title is required.".to_string());
        }
        if description.is_empty() {
            errors.push("Description is required.".to_string());
        }

        let price_cents = match self.price.trim() {
            "" => {
                errors.push("Price is required.".to_string());
                0
            },
            raw => match parse_cents(raw) {
                Some(cents) if cents > 0 => cents,
                _ => {
                    errors.push("Price must be a positive amount.".to_string());
                    0
                },
            },
        };

        let max_year = current_year + 5;
        let release_year = match self.release_year.trim() {
            "" => {
                errors.push("Release year is required.".to_string());
                0
            },
            raw => match raw.parse::<i32>() {
                Ok(year) if (1900..=max_year).contains(&year) => year,
                _ => {
                    errors.push(format!("Release year must be between 1900 and {max_year}."));
                    0
                },
            },
        };

        let duration = match self.duration.trim() {
            "" => {
                errors.push("Duration is required.".to_string());
                0
            },
            raw => match raw.parse::<i32>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => {
                    errors.push("Duration must be a positive number of minutes.".to_string());
                    0
                },
            },
        };

        let rating = match self.rating.trim() {
            "" => {
                errors.push("Rating is required.".to_string());
                0.0
            },
            raw => match raw.parse::<f64>() {
                Ok(r) if (0.0..=10.0).contains(&r) => r,
                _ => {
                    errors.push("Rating must be between 0 and 10.".to_string());
                    0.0
                },
            },
        };

        if !errors.is_empty() {
            return Err(MovieFormError::Invalid(errors));
        }

        let trailer_url = Some(self.trailer_url.trim()).filter(|u| !u.is_empty()).map(str::to_string);

        Ok(MovieInput {
            title: title.to_string(),
            description: description.to_string(),
            price_cents,
            release_year,
            duration,
            rating,
            trailer_url,
            status: if self.active { MovieStatus::Active } else { MovieStatus::Inactive },
            poster_url: None,
        })
    }

    /// Stores an uploaded poster, or falls back to the external URL field.
    /// `None` means neither was given.
    pub async fn resolve_poster(
        &self,
        upload_dir: &Path,
        max_bytes: usize,
        now: i64,
    ) -> Result<Option<String>, MovieFormError> {
        if let Some(file) = &self.poster_file {
            let path = store_poster(
                upload_dir,
                &slugify(&self.title),
                &file.file_name,
                &file.bytes,
                now,
                max_bytes,
            )
            .await?;
            return Ok(Some(path));
        }

        let url = self.poster_url.trim();
        Ok((!url.is_empty()).then(|| url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> MovieForm {
        MovieForm {
            title: "Heat".into(),
            description: "LA crime saga".into(),
            price: "12.50".into(),
            release_year: "1995".into(),
            duration: "170".into(),
            rating: "8.3".into(),
            active: true,
            ..Default::default()
        }
    }

    #[test]
    fn valid_form_produces_input() {
        let input = filled().validate(2026).unwrap();
        assert_eq!(input.title, "Heat");
        assert_eq!(input.price_cents, 1250);
        assert_eq!(input.release_year, 1995);
        assert_eq!(input.duration, 170);
        assert_eq!(input.status, MovieStatus::Active);
        assert_eq!(input.trailer_url, None);
    }

    #[test]
    fn missing_status_means_inactive() {
        let mut form = filled();
        form.active = false;
        assert_eq!(form.validate(2026).unwrap().status, MovieStatus::Inactive);
    }

    #[test]
    fn every_problem_is_reported() {
        let form = MovieForm {
            title: " ".into(),
            price: "0".into(),
            release_year: "2040".into(),
            duration: "-5".into(),
            rating: "11".into(),
            ..Default::default()
        };
        let MovieFormError::Invalid(errors) = form.validate(2026).unwrap_err() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 6);
        assert!(errors.contains(&"Release year must be between 1900 and 2031.".to_string()));
    }

    #[test]
    fn year_bounds_are_inclusive() {
        let mut form = filled();
        form.release_year = "1900".into();
        assert!(form.validate(2026).is_ok());
        form.release_year = "2031".into();
        assert!(form.validate(2026).is_ok());
        form.release_year = "1899".into();
        assert!(form.validate(2026).is_err());
    }

    #[tokio::test]
    async fn external_url_is_used_when_nothing_uploaded() {
        let mut form = filled();
        form.poster_url = " https://img.example.com/heat.jpg ".into();
        let poster = form.resolve_poster(Path::new("unused"), 10, 0).await.unwrap();
        assert_eq!(poster.as_deref(), Some("https://img.example.com/heat.jpg"));

        form.poster_url.clear();
        assert_eq!(form.resolve_poster(Path::new("unused"), 10, 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn bad_upload_is_a_form_error() {
        let mut form = filled();
        form.poster_file = Some(PosterFile { file_name: "heat.bmp".into(), bytes: vec![1, 2, 3] });
        let err = form.resolve_poster(Path::new("unused"), 10, 0).await.unwrap_err();
        assert_eq!(err.messages(), vec!["Poster must be a JPG, PNG or WebP image.".to_string()]);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ClassId, PresentationId, SlideId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub id: SlideId,
    pub presentation_id: PresentationId,
    pub class_id: ClassId,
    pub owner_id: UserId,
    pub img_file_name: String,
    pub question: String,
    pub order_number: i32,
    pub correct_answer: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A slide as submitted by the editor. A missing `slideId` means "create".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide_id: Option<SlideId>,
    pub presentation_id: Option<PresentationId>,
    pub img_file_name: Option<String>,
    pub question: Option<String>,
    pub order_number: Option<i32>,
    pub correct_answer: Option<String>,
}

impl SlideInput {
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.slide_id.is_none()
    }
}

/// Slide fields validated for insertion
#[derive(Debug, Clone)]
pub struct NewSlide {
    pub presentation_id: PresentationId,
    pub img_file_name: String,
    pub question: String,
    pub order_number: i32,
    pub correct_answer: String,
}

impl TryFrom<&SlideInput> for NewSlide {
    type Error = crate::Error;

    fn try_from(input: &SlideInput) -> crate::Result<Self> {
        let missing = || crate::Error::InvalidInput("ER_MISSING_FIELDS".to_string());
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            presentation_id: input.presentation_id.clone().ok_or_else(missing)?,
            img_file_name: non_empty(&input.img_file_name).ok_or_else(missing)?,
            question: non_empty(&input.question).ok_or_else(missing)?,
            order_number: input.order_number.ok_or_else(missing)?,
            correct_answer: non_empty(&input.correct_answer).ok_or_else(missing)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSlidesOutcome {
    pub saved: Vec<Slide>,
    pub db_errors: Vec<SlideInput>,
}

impl SaveSlidesOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.db_errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_input() -> SlideInput {
        SlideInput {
            slide_id: None,
            presentation_id: Some(PresentationId::from("p1")),
            img_file_name: Some("abc_photo.jpg".to_string()),
            question: Some("2 + 2?".to_string()),
            order_number: Some(1),
            correct_answer: Some("4".to_string()),
        }
    }

    #[test]
    fn test_new_slide_from_complete_input() {
        let slide = NewSlide::try_from(&complete_input()).unwrap();
        assert_eq!(slide.order_number, 1);
        assert_eq!(slide.correct_answer, "4");
    }

    #[test]
    fn test_new_slide_requires_every_field() {
        let mut input = complete_input();
        input.question = Some("   ".to_string());
        let err = NewSlide::try_from(&input).unwrap_err();
        assert_eq!(err.client_message(), "ER_MISSING_FIELDS");

        let mut input = complete_input();
        input.order_number = None;
        assert!(NewSlide::try_from(&input).is_err());
    }

    #[test]
    fn test_slide_input_deserializes_camel_case() {
        let input: SlideInput = serde_json::from_str(
            r#"{"slideId":"s1","presentationId":"p1","imgFileName":"a.jpg","orderNumber":2}"#,
        )
        .unwrap();
        assert!(!input.is_new());
        assert_eq!(input.order_number, Some(2));
    }
}

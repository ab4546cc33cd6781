use rand::Rng;
use shared::{
    prompts::PromptCatalog,
    protocol::{CreatePostRequest, GenerateImageRequest},
};
use thiserror::Error;

/// Image returned by the generator, still base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPhoto {
    pub b64: String,
}

impl GeneratedPhoto {
    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.b64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please enter a prompt")]
    MissingPrompt,
    #[error("Please generate an image with proper details")]
    IncompletePost,
}

/// State of the "create" form: author, prompt and the generated photo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatePostForm {
    pub name: String,
    pub prompt: String,
    pub photo: Option<String>,
}

impl CreatePostForm {
    /// Replaces the prompt with a different one from the catalog.
    pub fn surprise_me<R: Rng + ?Sized>(&mut self, catalog: &PromptCatalog, rng: &mut R) -> &str {
        self.prompt = catalog.surprise_me(&self.prompt, rng);
        &self.prompt
    }

    pub fn set_photo_from_generated(&mut self, photo: &GeneratedPhoto) {
        self.photo = Some(photo.data_url());
    }

    pub fn generation_request(&self) -> Result<GenerateImageRequest, FormError> {
        if self.prompt.trim().is_empty() {
            return Err(FormError::MissingPrompt);
        }
        Ok(GenerateImageRequest {
            prompt: self.prompt.clone(),
        })
    }

    pub fn share_request(&self) -> Result<CreatePostRequest, FormError> {
        let photo = self
            .photo
            .as_deref()
            .filter(|photo| !photo.trim().is_empty())
            .ok_or(FormError::IncompletePost)?;
        if self.name.trim().is_empty() || self.prompt.trim().is_empty() {
            return Err(FormError::IncompletePost);
        }
        Ok(CreatePostRequest {
            name: self.name.clone(),
            prompt: self.prompt.clone(),
            photo: photo.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;

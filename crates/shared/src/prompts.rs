//! Curated "surprise me" prompts and the random prompt selector.

use std::sync::Arc;

use rand::Rng;
use thiserror::Error;

pub const SURPRISE_ME_PROMPTS: &[&str] = &[
    "an armchair in the shape of an avocado",
    "a surrealist dream-like oil painting by Salvador Dali of a cat playing checkers",
    "teddy bears shopping for groceries in Japan, ukiyo-e",
    "an oil painting by Matisse of a humanoid robot playing chess",
    "panda mad scientist mixing sparkling chemicals, digital art",
    "a macro 35mm photograph of two mice in Hawaii, they're each wearing tiny swimsuits and are carrying tiny surf boards, digital art",
    "3D render of a cute tropical fish in an aquarium on a dark blue background, digital art",
    "an astronaut lounging in a tropical resort in space, vaporwave",
    "an oil painting portrait of a capybara wearing medieval royal robes and an ornate crown on a dark background",
    "a stained glass window depicting a hamburger and french fries",
    "a pencil and watercolor drawing of a bright city in the future with flying cars",
    "a sunlit indoor lounge area with a pool with clear water and another pool with translucent pastel pink water, next to a big window, digital art",
    "a fortune-telling shiba inu reading your fate in a giant hamburger, digital art",
    "a futuristic neon lit cyborg face",
    "a photo of a white fur monster standing in a purple room",
    "a comic book cover of a superhero wearing headphones",
    "a sea otter with a pearl earring by Johannes Vermeer",
    "a hand-drawn sailboat circled by birds on the sea at sunrise",
    "an expressive oil painting of a basketball player dunking, depicted as an explosion of a nebula",
    "a plush toy goat sitting on a couch holding a magnifying glass",
    "a lighthouse on a cliff during a thunderstorm, in the style of a woodblock print",
    "a cozy cabin library at night lit by a single candle, isometric digital art",
    "a red fox made of origami paper walking through an autumn forest",
    "a vintage travel poster for a resort on the moon",
    "a robot watering a bonsai tree on a rainy balcony, studio ghibli style",
    "a bowl of ramen floating in zero gravity aboard a space station, photorealistic",
    "a medieval tapestry depicting a cat fixing a laptop",
    "a giant jellyfish drifting over a desert at dusk, long exposure photograph",
    "a steampunk owl with brass gears and glowing eyes, highly detailed",
    "a tiny dragon sleeping in a teacup, soft watercolor",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("prompt catalog must contain at least one prompt")]
    EmptyCatalog,
}

/// Immutable, cheaply cloneable list of prompts available to the selector.
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    prompts: Arc<[String]>,
}

impl PromptCatalog {
    pub fn new<I, S>(prompts: I) -> Result<Self, PromptError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prompts: Arc<[String]> = prompts.into_iter().map(Into::into).collect();
        if prompts.is_empty() {
            return Err(PromptError::EmptyCatalog);
        }
        Ok(Self { prompts })
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Always false; construction rejects empty catalogs.
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Returns a prompt different from `current` whenever the catalog holds one.
    pub fn surprise_me<R: Rng + ?Sized>(&self, current: &str, rng: &mut R) -> String {
        pick_different(current, &self.prompts, rng).unwrap_or_default()
    }
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self {
            prompts: SURPRISE_ME_PROMPTS.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

/// Draws a prompt uniformly from `catalog`, never returning `current` when
/// another value is available.
///
/// The draw is taken over the entries that differ from `current`, which gives
/// the same distribution as redrawing on a collision but always terminates. If
/// every entry equals `current` (including the single-element case) the first
/// entry is returned.
pub fn select_random_prompt<S, R>(
    current: &str,
    catalog: &[S],
    rng: &mut R,
) -> Result<String, PromptError>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    pick_different(current, catalog, rng).ok_or(PromptError::EmptyCatalog)
}

fn pick_different<S, R>(current: &str, catalog: &[S], rng: &mut R) -> Option<String>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let first = catalog.first()?.as_ref();
    let candidates: Vec<&str> = catalog
        .iter()
        .map(AsRef::as_ref)
        .filter(|prompt| *prompt != current)
        .collect();
    if candidates.is_empty() {
        return Some(first.to_string());
    }
    let index = rng.gen_range(0..candidates.len());
    Some(candidates[index].to_string())
}

#[cfg(test)]
#[path = "tests/prompts_tests.rs"]
mod tests;

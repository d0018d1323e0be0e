pub mod coerce;
pub mod extractor;
pub mod gemini_client;
pub mod image_lookup;
pub mod normalizer;
pub mod openrouter_client;
pub mod prompts;
pub mod validator;

pub use extractor::extract_json_payload;
pub use gemini_client::GeminiClient;
pub use image_lookup::{fallback_image_url, image_query, DuckDuckGoImageLookup, ImageLookup, NoImageLookup};
pub use normalizer::{repair_itinerary, Normalizer, ParsedItinerary};
pub use openrouter_client::OpenRouterClient;
pub use validator::check_constraints;

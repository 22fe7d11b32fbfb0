//! Story generation
//!
//! ```rust
//! use bedtime_story::{StoryFactory, TemplateStoryFactory};
//!
//! let factory = TemplateStoryFactory::with_seed(42);
//! let story = factory.generate(10 * 60).expect("valid target");
//! assert_eq!(story.total_duration_seconds(), 600);
//! assert_eq!(story.page_count(), 10);
//! ```

mod factory;
mod templates;

pub use factory::{distribute_duration, StoryFactory, TemplateStoryFactory};

use crate::templates;
use bedtime_core::{Mood, Scene, StoryError, StoryModel, StoryPage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Produces stories of a requested length
pub trait StoryFactory: Send + Sync {
    /// Builds a story whose pages add up to exactly `target_duration_seconds`
    fn generate(&self, target_duration_seconds: u32) -> Result<StoryModel, StoryError>;
}

/// Chance that a page stays in the previous page's scene
const SCENE_CONTINUITY: f64 = 0.6;

/// Assembles stories from the built-in scene templates
///
/// With a seed every call to [`generate`](StoryFactory::generate) continues
/// the same random sequence, so a fresh factory with the same seed repeats
/// the same stories in the same order.
#[derive(Debug)]
pub struct TemplateStoryFactory {
    page_seconds: u32,
    max_pages: usize,
    rng: Mutex<StdRng>,
}

impl TemplateStoryFactory {
    pub const DEFAULT_PAGE_SECONDS: u32 = 60;
    pub const DEFAULT_MAX_PAGES: usize = 30;

    pub fn new() -> Self {
        Self::with_seed(rand::random::<u64>())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            page_seconds: Self::DEFAULT_PAGE_SECONDS,
            max_pages: Self::DEFAULT_MAX_PAGES,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Target length of a single page
    pub fn with_page_seconds(mut self, page_seconds: u32) -> Self {
        self.page_seconds = page_seconds;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn page_seconds(&self) -> u32 {
        self.page_seconds
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Number of pages a story of `target` seconds gets
    pub fn page_count_for(&self, target: u32) -> usize {
        if self.page_seconds == 0 || target == 0 {
            return 1;
        }
        let rounded = (u64::from(target) + u64::from(self.page_seconds) / 2)
            / u64::from(self.page_seconds);
        let count = usize::try_from(rounded).unwrap_or(usize::MAX);
        count
            .clamp(1, self.max_pages.max(1))
            .min(target as usize)
    }
}

impl Default for TemplateStoryFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits `total` into `parts` durations that differ by at most one second
pub fn distribute_duration(total: u32, parts: usize) -> Vec<u32> {
    if parts == 0 {
        return Vec::new();
    }
    let parts_u32 = u32::try_from(parts).unwrap_or(u32::MAX);
    let base = total / parts_u32;
    let extra = (total % parts_u32) as usize;
    (0..parts)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

fn dominant_scene(scenes: &[Scene]) -> Option<Scene> {
    let mut best: Option<(Scene, usize)> = None;
    for scene in scenes {
        let count = scenes.iter().filter(|s| *s == scene).count();
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((*scene, count));
        }
    }
    best.map(|(scene, _)| scene)
}

impl StoryFactory for TemplateStoryFactory {
    fn generate(&self, target_duration_seconds: u32) -> Result<StoryModel, StoryError> {
        if target_duration_seconds == 0 {
            return Err(StoryError::InvalidDuration(0));
        }
        if self.page_seconds == 0 || self.max_pages == 0 {
            return Err(StoryError::InvalidTemplate(format!(
                "page_seconds ({}) and max_pages ({}) must be positive",
                self.page_seconds, self.max_pages
            )));
        }

        let durations = distribute_duration(
            target_duration_seconds,
            self.page_count_for(target_duration_seconds),
        );

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let name = templates::CHARACTERS[rng.random_range(0..templates::CHARACTERS.len())];

        let mut scenes = Vec::with_capacity(durations.len());
        let mut pages = Vec::with_capacity(durations.len());
        let mut scene = Scene::ALL[rng.random_range(0..Scene::ALL.len())];
        let mut last_sentence: Option<&str> = None;

        for (index, duration) in durations.iter().copied().enumerate() {
            if index > 0 && !rng.random_bool(SCENE_CONTINUITY) {
                scene = Scene::ALL[rng.random_range(0..Scene::ALL.len())];
            }

            let options = templates::sentences(scene);
            let mut sentence = options[rng.random_range(0..options.len())];
            if Some(sentence) == last_sentence && options.len() > 1 {
                let next = (options.iter().position(|s| *s == sentence).unwrap_or(0) + 1)
                    % options.len();
                sentence = options[next];
            }
            last_sentence = Some(sentence);

            let moods: &[Mood] = templates::moods(scene);
            let mood = moods[rng.random_range(0..moods.len())];

            scenes.push(scene);
            pages.push(StoryPage::new(
                sentence.replace("{name}", name),
                mood,
                scene,
                duration,
            )?);
        }
        drop(rng);

        let title_scene = dominant_scene(&scenes).unwrap_or(Scene::Stars);
        let story = StoryModel::new(templates::title(title_scene, name), pages)?;

        log::debug!(
            "Generated '{}' with {} pages ({}s)",
            story.title(),
            story.page_count(),
            story.total_duration_seconds()
        );
        Ok(story)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribute_duration() {
        assert_eq!(distribute_duration(10, 3), vec![4, 3, 3]);
        assert_eq!(distribute_duration(9, 3), vec![3, 3, 3]);
        assert_eq!(distribute_duration(5, 0), Vec::<u32>::new());
    }

    #[test]
    fn test_page_count_rounds_and_clamps() {
        let factory = TemplateStoryFactory::with_seed(1);
        assert_eq!(factory.page_count_for(60), 1);
        assert_eq!(factory.page_count_for(89), 1);
        assert_eq!(factory.page_count_for(90), 2);
        assert_eq!(factory.page_count_for(15 * 60), 15);
        assert_eq!(factory.page_count_for(3 * 60 * 60), 30);
        assert_eq!(factory.page_count_for(5), 1);
    }

    #[test]
    fn test_tiny_pages_never_reach_zero() {
        let factory = TemplateStoryFactory::with_seed(1).with_page_seconds(1);
        assert_eq!(factory.page_count_for(3), 3);
        assert_eq!(factory.page_count_for(100), 30);
    }

    #[test]
    fn test_dominant_scene_first_wins_ties() {
        assert_eq!(
            dominant_scene(&[Scene::Moon, Scene::Forest, Scene::Forest, Scene::Moon]),
            Some(Scene::Moon)
        );
        assert_eq!(
            dominant_scene(&[Scene::Moon, Scene::Forest, Scene::Forest]),
            Some(Scene::Forest)
        );
        assert_eq!(dominant_scene(&[]), None);
    }

    #[test]
    fn test_zero_target_is_rejected() {
        let factory = TemplateStoryFactory::with_seed(7);
        assert!(matches!(
            factory.generate(0),
            Err(StoryError::InvalidDuration(0))
        ));
    }

    #[test]
    fn test_bad_template_settings() {
        let factory = TemplateStoryFactory::with_seed(7).with_max_pages(0);
        assert!(matches!(
            factory.generate(600),
            Err(StoryError::InvalidTemplate(_))
        ));
    }
}

//! Built-in text templates
//!
//! `{name}` in a sentence is replaced by the story's main character.

use bedtime_core::{Mood, Scene};

pub(crate) const CHARACTERS: [&str; 8] = [
    "Luna", "Milo", "Pip", "Hazel", "Otto", "Willow", "Bramble", "Juniper",
];

pub(crate) fn sentences(scene: Scene) -> &'static [&'static str] {
    match scene {
        Scene::Forest => &[
            "{name} wandered along a mossy path while the tall trees whispered goodnight.",
            "Deep in the forest, {name} found a soft bed of leaves beneath an old oak.",
            "Fireflies blinked between the ferns as {name} listened to the wind in the branches.",
            "A sleepy fox curled up nearby, and {name} smiled at the quiet forest.",
        ],
        Scene::Stars => &[
            "{name} lay in the meadow and counted the stars one by one.",
            "A shooting star drew a silver line across the sky, and {name} made a wish.",
            "The stars hummed a slow tune, and {name} felt warm and safe.",
            "{name} traced the shape of a great bear among the twinkling lights.",
        ],
        Scene::Moon => &[
            "The round moon rose over the hills and lit the way home for {name}.",
            "{name} climbed onto a moonbeam and floated gently above the sleeping town.",
            "An owl on the windowsill told {name} stories about the moon's long journey.",
            "Silver light filled the room as {name} pulled the blanket close.",
        ],
        Scene::Clouds => &[
            "{name} drifted on a pillow-soft cloud, high above the quiet world.",
            "A gentle rain began, and {name} listened to it tapping on the roof.",
            "The clouds shaped themselves into sheep, and {name} watched them go by.",
            "Wrapped in a grey cloud blanket, {name} felt the breeze rock it slowly.",
        ],
        Scene::Animals => &[
            "{name} said goodnight to the rabbits, the badgers and the little mice.",
            "By the stream, the frogs sang a low lullaby just for {name}.",
            "A family of ducks tucked their heads under their wings, and so did {name}.",
            "The crickets chirped softly while {name} and the old tortoise yawned together.",
        ],
    }
}

pub(crate) fn title(scene: Scene, name: &str) -> String {
    match scene {
        Scene::Forest => format!("{} and the Whispering Forest", name),
        Scene::Stars => format!("{} Counts the Stars", name),
        Scene::Moon => format!("{} and the Sleepy Moon", name),
        Scene::Clouds => format!("{} Among the Clouds", name),
        Scene::Animals => format!("Goodnight, {}", name),
    }
}

/// Moods that suit a scene; the first is the usual one
pub(crate) fn moods(scene: Scene) -> &'static [Mood] {
    match scene {
        Scene::Forest => &[Mood::Peaceful, Mood::Calm],
        Scene::Stars => &[Mood::Dreamy, Mood::Peaceful],
        Scene::Moon => &[Mood::Dreamy, Mood::Gentle],
        Scene::Clouds => &[Mood::Calm, Mood::Dreamy],
        Scene::Animals => &[Mood::Gentle, Mood::Peaceful],
    }
}

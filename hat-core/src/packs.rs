//! Word packs: named lists of candidate words.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("Unknown word pack: {0}")]
    UnknownPack(String),
    #[error("A word pack needs at least one valid word")]
    EmptyPack,
}

/// A named list of words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPack {
    pub id: String,
    pub name: String,
    pub description: String,
    pub words: Vec<String>,
}

impl WordPack {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        words: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            words,
        }
    }

    pub fn is_generated(&self) -> bool {
        self.id.starts_with(GENERATED_PREFIX)
    }
}

const GENERATED_PREFIX: &str = "generated_";

/// All packs the app knows about: built-in presets plus generated ones.
#[derive(Debug, Clone)]
pub struct WordPackStore {
    packs: Vec<WordPack>,
}

impl Default for WordPackStore {
    fn default() -> Self {
        Self::with_presets()
    }
}

impl WordPackStore {
    /// An empty store.
    pub fn new() -> Self {
        Self { packs: Vec::new() }
    }

    /// A store holding the built-in packs.
    pub fn with_presets() -> Self {
        Self {
            packs: preset_packs(),
        }
    }

    pub fn all(&self) -> &[WordPack] {
        &self.packs
    }

    pub fn get(&self, id: &str) -> Option<&WordPack> {
        self.packs.iter().find(|p| p.id == id)
    }

    /// Packs for `ids`, in the order given. Unknown ids are skipped.
    pub fn get_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&WordPack> {
        ids.iter().filter_map(|id| self.get(id.as_ref())).collect()
    }

    /// Every word from the given packs, first occurrence kept.
    pub fn collect_words<S: AsRef<str>>(&self, ids: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        self.get_by_ids(ids)
            .into_iter()
            .flat_map(|p| p.words.iter())
            .filter(|w| seen.insert(w.as_str()))
            .cloned()
            .collect()
    }

    pub fn total_available<S: AsRef<str>>(&self, ids: &[S]) -> usize {
        self.collect_words(ids).len()
    }

    /// Insert a pack, replacing any pack with the same id.
    pub fn insert(&mut self, pack: WordPack) {
        match self.packs.iter_mut().find(|p| p.id == pack.id) {
            Some(existing) => *existing = pack,
            None => self.packs.push(pack),
        }
    }

    /// Store a generated word list as a new pack and return its id.
    pub fn add_generated_pack(
        &mut self,
        name: impl Into<String>,
        words: Vec<String>,
    ) -> Result<String, PackError> {
        let words = wordgen::normalize_words(words, &HashSet::new());
        if words.is_empty() {
            return Err(PackError::EmptyPack);
        }

        let id = format!("{GENERATED_PREFIX}{}", Uuid::new_v4().simple());
        let name = name.into();
        tracing::info!(%id, %name, words = words.len(), "stored generated word pack");

        self.packs.push(WordPack {
            id: id.clone(),
            name,
            description: "Generated pack".to_string(),
            words,
        });
        Ok(id)
    }

    pub fn remove(&mut self, id: &str) -> Result<WordPack, PackError> {
        let pos = self
            .packs
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PackError::UnknownPack(id.to_string()))?;
        Ok(self.packs.remove(pos))
    }
}

fn pack(id: &str, name: &str, description: &str, words: &[&str]) -> WordPack {
    WordPack::new(
        id,
        name,
        description,
        words.iter().map(|w| w.to_string()).collect(),
    )
}

fn preset_packs() -> Vec<WordPack> {
    vec![
        pack(
            "default",
            "Classic",
            "A mixed bag of everyday things",
            &[
                "umbrella", "bicycle", "lighthouse", "volcano", "pillow", "telescope", "sandwich",
                "guitar", "ladder", "mirror", "compass", "snowman", "anchor", "balloon", "candle",
                "castle", "dragon", "elevator", "fireworks", "glasses", "hammock", "igloo",
                "jellyfish", "kangaroo", "lemonade", "magnet", "necklace", "octopus", "parachute",
                "pyramid", "rainbow", "scissors", "skateboard", "toothbrush", "tornado",
                "unicorn", "vacuum", "waterfall", "xylophone", "yacht", "zipper", "backpack",
                "campfire", "doorbell", "eyebrow", "flashlight", "helicopter", "keyboard",
                "microscope", "submarine",
            ],
        ),
        pack(
            "animals",
            "Animals",
            "Creatures from farms, forests and oceans",
            &[
                "elephant", "giraffe", "penguin", "crocodile", "hedgehog", "flamingo", "squirrel",
                "dolphin", "butterfly", "tortoise", "peacock", "gorilla", "chameleon", "rabbit",
                "owl", "spider", "camel", "zebra", "lobster", "parrot", "beaver", "cheetah",
                "hamster", "seahorse", "woodpecker", "walrus", "mosquito", "panda", "rooster",
                "snail",
            ],
        ),
        pack(
            "food",
            "Food",
            "Things you can eat or drink",
            &[
                "pancake", "spaghetti", "pineapple", "popcorn", "omelette", "watermelon",
                "pretzel", "sushi", "burrito", "cupcake", "lollipop", "broccoli", "coconut",
                "croissant", "dumpling", "milkshake", "avocado", "cheesecake", "mushroom",
                "pickle", "waffle", "lemon", "garlic", "noodle", "muffin", "porridge", "carrot",
                "donut", "yogurt", "pumpkin",
            ],
        ),
        pack(
            "professions",
            "Professions",
            "People and the jobs they do",
            &[
                "firefighter", "astronaut", "dentist", "plumber", "magician", "lifeguard",
                "carpenter", "pilot", "surgeon", "librarian", "baker", "sculptor", "detective",
                "florist", "juggler", "mechanic", "photographer", "referee", "sailor",
                "shepherd", "tailor", "waiter", "zookeeper", "barber", "clown", "farmer",
                "judge", "painter", "poet", "acrobat",
            ],
        ),
    ]
}

// src/persona.rs
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::models::{Category, Demographic, Difficulty, Persona, Venue};

/// Produces the roleplay partner and suggested openers for a venue.
pub trait PersonaGenerator: Send + Sync {
    fn generate(&self, venue: &Venue) -> Persona;
    fn openers(&self, venue: &Venue, persona: &Persona) -> Vec<String>;
}

pub fn names(demographic: Demographic) -> &'static [&'static str] {
    match demographic {
        Demographic::Asian => &[
            "Emily", "Jessica", "Michelle", "Amy", "Christine", "Lisa", "Jennifer", "Stephanie",
            "Tiffany", "Sarah",
        ],
        Demographic::Latina => &[
            "Sofia", "Isabella", "Valentina", "Camila", "Lucia", "Maria", "Elena", "Carmen", "Rosa",
            "Ana",
        ],
        Demographic::White => &[
            "Emma", "Olivia", "Sophia", "Ava", "Mia", "Harper", "Evelyn", "Abigail", "Ella",
            "Scarlett",
        ],
        Demographic::Black => &[
            "Aaliyah", "Zara", "Imani", "Destiny", "Jasmine", "Diamond", "Taylor", "Brianna", "Maya",
            "Kiara",
        ],
        Demographic::Mena => &[
            "Yasmin", "Layla", "Nadia", "Fatima", "Amira", "Sara", "Lina", "Rania", "Dina", "Leila",
        ],
        Demographic::SouthAsian => &[
            "Priya", "Ananya", "Aisha", "Neha", "Kavya", "Shreya", "Meera", "Sana", "Riya", "Pooja",
        ],
    }
}

pub const EMOJIS: &[&str] = &["👩", "👩‍🦱", "👩‍🦰", "🧑", "👱‍♀️", "👩‍🦳"];

pub const OCCUPATIONS: &[&str] = &[
    "UCLA Student (Psychology)",
    "UCLA Student (Business)",
    "UCLA Student (Engineering)",
    "UCLA Student (Pre-Med)",
    "Grad Student (MBA)",
    "Grad Student (Law)",
    "Marketing Coordinator",
    "Software Engineer",
    "Nurse",
    "Teacher",
    "Designer",
    "Content Creator",
    "Photographer",
    "Fitness Instructor",
    "Bartender",
];

pub const VIBES: &[&str] = &[
    "Chill & laid-back",
    "Energetic & outgoing",
    "Shy but friendly",
    "Confident & direct",
    "Artsy & creative",
    "Bookworm & intellectual",
    "Athletic & active",
    "Bubbly & talkative",
    "Reserved but warm",
    "Playful & flirty",
];

pub const INTERESTS: &[&str] = &[
    "yoga", "hiking", "boba", "photography", "travel", "music", "cooking", "reading", "fitness",
    "art", "fashion", "movies", "dancing", "skincare", "coffee", "anime", "gaming", "thrifting",
    "brunch", "concerts", "netflix", "dogs", "cats", "painting",
];

pub fn scenarios(category: Category) -> &'static [&'static str] {
    match category {
        Category::Food => &[
            "She's waiting in line, scrolling through her phone, looking slightly bored.",
            "She's sitting alone at a table, enjoying her food and people-watching.",
            "She's looking at the menu on the wall, trying to decide what to order.",
            "She just received her order and is taking a photo of it.",
            "She's sitting at the counter, eating and reading something on her phone.",
        ],
        Category::Shopping => &[
            "She's browsing through racks of clothes, occasionally holding things up.",
            "She's waiting outside a store while her friend is inside trying something on.",
            "She's sitting on a bench, taking a break with some shopping bags.",
            "She's looking at her phone near the directory, maybe figuring out where to go.",
            "She's in line at a checkout counter, scrolling through her phone.",
        ],
        Category::Campus => &[
            "She's studying at a table with her laptop open, occasionally looking around.",
            "She's walking between classes, earbuds in but not looking too rushed.",
            "She's sitting on the grass with a book, enjoying the weather.",
            "She's at a coffee kiosk, waiting for her order.",
            "She's at a club table, handing out flyers but not super busy.",
        ],
        Category::Gym => &[
            "She just finished a workout and is stretching near the mats.",
            "She's filling up her water bottle at the fountain.",
            "She's waiting for a machine to open up, doing some light stretches.",
            "She's in the cardio area, just finishing up on the treadmill.",
            "She's near the entrance, checking her phone after her workout.",
        ],
        Category::Outdoor => &[
            "She's sitting on a blanket, reading a book and enjoying the sun.",
            "She's taking photos of the scenery with her phone.",
            "She's walking her dog along the path.",
            "She's sitting on a bench, eating a snack and people-watching.",
            "She's stretching after what looks like a run.",
        ],
        Category::Social => &[
            "She's at the bar waiting to order a drink, looking around the venue.",
            "She's with friends but seems to have separated from the group for a moment.",
            "She's near the edge of the dance floor, vibing to the music.",
            "She's looking at her phone near the entrance, maybe waiting for someone.",
            "She's by herself at a high-top table, sipping a drink.",
        ],
    }
}

pub fn difficulty_for_vibe(vibe: &str) -> Difficulty {
    if vibe.contains("Shy") || vibe.contains("Reserved") {
        Difficulty::Hard
    } else if vibe.contains("outgoing") || vibe.contains("Bubbly") || vibe.contains("flirty") {
        Difficulty::Easy
    } else {
        Difficulty::Medium
    }
}

/// Draws personas from the fixed pools above.
pub struct RandomPersonaGenerator {
    rng: Mutex<StdRng>,
}

impl RandomPersonaGenerator {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        RandomPersonaGenerator {
            rng: Mutex::new(rng),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *rng)
    }
}

impl Default for RandomPersonaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn pick<'a, R: Rng>(rng: &mut R, pool: &[&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

/// Weighted draw favouring demographics with higher venue multipliers.
fn weighted_demographic<R: Rng>(rng: &mut R, venue: &Venue) -> Demographic {
    let weights = &venue.demographic_weights;
    let total: f64 = Demographic::ALL.iter().map(|d| weights.weight(*d)).sum();
    let mut roll = rng.gen_range(0.0..total);
    for demographic in Demographic::ALL {
        roll -= weights.weight(demographic);
        if roll <= 0.0 {
            return demographic;
        }
    }
    Demographic::ALL[Demographic::ALL.len() - 1]
}

fn category_openers<R: Rng>(rng: &mut R, category: Category) -> Vec<String> {
    match category {
        Category::Food => vec![
            format!(
                "Hey, have you tried the {} here before? I'm trying to decide what to get.",
                pick(rng, &["ramen", "dumplings", "boba", "pastries", "coffee"])
            ),
            "That looks amazing - what did you order?".to_string(),
            "This line is crazy long, must be worth it though right?".to_string(),
            "Quick question - do you know if they have good vegetarian options here?".to_string(),
        ],
        Category::Shopping => vec![
            format!(
                "Hey, quick question - do you think this would look better in {} or {}?",
                pick(rng, &["blue", "black", "white"]),
                pick(rng, &["gray", "navy", "green"])
            ),
            "Excuse me, have you been to this store before? I'm looking for something specific."
                .to_string(),
            format!(
                "I like your style - where did you get that {}?",
                pick(rng, &["jacket", "bag", "shoes"])
            ),
        ],
        Category::Campus => vec![
            "Hey, is this seat taken? Everywhere else is packed.".to_string(),
            format!(
                "What class are you studying for? I'm procrastinating on my {}.",
                pick(rng, &["essay", "midterm", "project"])
            ),
            "Random question - do you know a good coffee spot around here?".to_string(),
            format!(
                "Hi! Are you in {}? You look familiar.",
                pick(rng, &["psych", "econ", "comm"])
            ),
        ],
        Category::Gym => vec![
            "Hey, are you done with this machine? No rush, just checking.".to_string(),
            format!(
                "Quick question - do you know what time the {} class starts?",
                pick(rng, &["yoga", "spin", "HIIT"])
            ),
            "Sorry to bother you, but could you spot me real quick?".to_string(),
        ],
        Category::Outdoor => vec![
            "Hey, cute dog! What's their name?".to_string(),
            "Beautiful day, right? Had to get outside.".to_string(),
            "Do you come here often? I'm new to the area.".to_string(),
            "I love this spot - it's so peaceful.".to_string(),
        ],
        Category::Social => vec![
            "Hey! What are you drinking? I need some inspiration.".to_string(),
            "Having a good night?".to_string(),
            "You look like you're having more fun than me - what's your secret?".to_string(),
            "I love this song - do you know what it is?".to_string(),
        ],
    }
}

fn interest_opener<R: Rng>(rng: &mut R, persona: &Persona) -> Option<String> {
    let interest = persona.interests.choose(rng)?;
    let noticed = match interest.as_str() {
        "yoga" => "have a yoga mat".to_string(),
        "photography" => "have a nice camera".to_string(),
        "reading" => "reading - what book is that".to_string(),
        "fitness" => "just finished a workout".to_string(),
        other => format!("seem into {other}"),
    };
    let follow_up = pick(
        rng,
        &["I love that too!", "I've been wanting to get into that.", "Any recommendations?"],
    );
    Some(format!("I noticed you {noticed} - {follow_up}"))
}

impl PersonaGenerator for RandomPersonaGenerator {
    fn generate(&self, venue: &Venue) -> Persona {
        self.with_rng(|rng| {
            let demographic = weighted_demographic(rng, venue);
            let vibe = pick(rng, VIBES);
            let interest_count = rng.gen_range(3..=4);
            let interests = INTERESTS
                .choose_multiple(rng, interest_count)
                .map(|s| s.to_string())
                .collect();

            Persona {
                name: pick(rng, names(demographic)).to_string(),
                age: rng.gen_range(18..=27),
                emoji: pick(rng, EMOJIS).to_string(),
                occupation: pick(rng, OCCUPATIONS).to_string(),
                vibe: vibe.to_string(),
                interests,
                scenario: pick(rng, scenarios(venue.category)).to_string(),
                demographic,
                difficulty: difficulty_for_vibe(vibe),
            }
        })
    }

    fn openers(&self, venue: &Venue, persona: &Persona) -> Vec<String> {
        self.with_rng(|rng| {
            let pool = category_openers(rng, venue.category);
            let mut openers: Vec<String> = pool.choose_multiple(rng, 3).cloned().collect();
            openers.extend(interest_opener(rng, persona));
            openers
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn generated_persona_draws_from_pools() {
        let catalog = Catalog::builtin().unwrap();
        let generator = RandomPersonaGenerator::with_seed(7);
        for venue in catalog.venues() {
            let persona = generator.generate(venue);
            assert!(names(persona.demographic).contains(&persona.name.as_str()));
            assert!(EMOJIS.contains(&persona.emoji.as_str()));
            assert!(OCCUPATIONS.contains(&persona.occupation.as_str()));
            assert!(VIBES.contains(&persona.vibe.as_str()));
            assert!(scenarios(venue.category).contains(&persona.scenario.as_str()));
            assert!((18..=27).contains(&persona.age));
            assert!((3..=4).contains(&persona.interests.len()));
            let mut unique = persona.interests.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), persona.interests.len());
            assert_eq!(persona.difficulty, difficulty_for_vibe(&persona.vibe));
        }
    }

    #[test]
    fn seeded_generators_agree() {
        let catalog = Catalog::builtin().unwrap();
        let venue = &catalog.venues()[3];
        let a = RandomPersonaGenerator::with_seed(42);
        let b = RandomPersonaGenerator::with_seed(42);
        assert_eq!(a.generate(venue), b.generate(venue));
    }

    #[test]
    fn openers_are_three_plus_interest() {
        let catalog = Catalog::builtin().unwrap();
        let generator = RandomPersonaGenerator::with_seed(3);
        for venue in catalog.venues() {
            let persona = generator.generate(venue);
            let openers = generator.openers(venue, &persona);
            assert_eq!(openers.len(), 4);
            assert!(openers[3].starts_with("I noticed you"));
        }
    }

    #[test]
    fn vibe_sets_difficulty() {
        assert_eq!(difficulty_for_vibe("Shy but friendly"), Difficulty::Hard);
        assert_eq!(difficulty_for_vibe("Reserved but warm"), Difficulty::Hard);
        assert_eq!(difficulty_for_vibe("Energetic & outgoing"), Difficulty::Easy);
        assert_eq!(difficulty_for_vibe("Playful & flirty"), Difficulty::Easy);
        assert_eq!(difficulty_for_vibe("Confident & direct"), Difficulty::Medium);
    }
}

use log::info;
use serde::Serialize;

use super::{new_id, now, tours::write_tour, Database};
use crate::{
    error::AppError,
    models::{tour::slugify, Difficulty, Tour},
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: bool,
}

struct SampleTour {
    name: &'static str,
    duration: u32,
    max_group_size: u32,
    difficulty: Difficulty,
    ratings_average: f64,
    ratings_quantity: u32,
    price: f64,
    price_discount: f64,
    summary: &'static str,
    description: &'static str,
    start_dates: [&'static str; 2],
}

const SAMPLE_TOURS: [SampleTour; 9] = [
    SampleTour {
        name: "The Forest Hiker",
        duration: 5,
        max_group_size: 25,
        difficulty: Difficulty::Easy,
        ratings_average: 4.7,
        ratings_quantity: 37,
        price: 397.0,
        price_discount: 0.0,
        summary: "Breathe in the forest air on a guided hiking adventure.",
        description: "Explore lush forest trails with expert guides, scenic overlooks, and cozy campfire nights.",
        start_dates: ["2026-04-01", "2026-05-01"],
    },
    SampleTour {
        name: "The Sea Explorer",
        duration: 7,
        max_group_size: 15,
        difficulty: Difficulty::Medium,
        ratings_average: 4.8,
        ratings_quantity: 23,
        price: 497.0,
        price_discount: 50.0,
        summary: "Sail into crystal waters with a small-group crew.",
        description: "Snorkel hidden coves, explore coastal villages, and enjoy fresh seafood by the shore.",
        start_dates: ["2026-04-15", "2026-06-10"],
    },
    SampleTour {
        name: "The Snow Adventurer",
        duration: 4,
        max_group_size: 10,
        difficulty: Difficulty::Difficult,
        ratings_average: 4.6,
        ratings_quantity: 14,
        price: 899.0,
        price_discount: 0.0,
        summary: "Chase powder and auroras in the snowy backcountry.",
        description: "Snowshoe across alpine landscapes, warm up in mountain lodges, and spot northern lights.",
        start_dates: ["2026-01-20", "2026-02-10"],
    },
    SampleTour {
        name: "The City Wanderer",
        duration: 3,
        max_group_size: 30,
        difficulty: Difficulty::Easy,
        ratings_average: 4.4,
        ratings_quantity: 19,
        price: 299.0,
        price_discount: 0.0,
        summary: "A curated escape through iconic city highlights.",
        description: "Visit hidden cafes, famous landmarks, and neighborhoods loved by locals.",
        start_dates: ["2026-03-12", "2026-05-05"],
    },
    SampleTour {
        name: "The Park Camper",
        duration: 10,
        max_group_size: 12,
        difficulty: Difficulty::Medium,
        ratings_average: 4.9,
        ratings_quantity: 45,
        price: 1097.0,
        price_discount: 0.0,
        summary: "Camp under the stars in America's top parks.",
        description: "Wake up to sunrise hikes, guided wildlife spotting, and nights under the Milky Way.",
        start_dates: ["2026-06-01", "2026-07-10"],
    },
    SampleTour {
        name: "The Sports Lover",
        duration: 5,
        max_group_size: 20,
        difficulty: Difficulty::Easy,
        ratings_average: 4.3,
        ratings_quantity: 12,
        price: 399.0,
        price_discount: 0.0,
        summary: "Live match days, stadium tours, and local celebrations.",
        description: "Experience the energy of world-class sports with behind-the-scenes access.",
        start_dates: ["2026-08-05", "2026-09-02"],
    },
    SampleTour {
        name: "The Wine Taster",
        duration: 6,
        max_group_size: 14,
        difficulty: Difficulty::Medium,
        ratings_average: 4.8,
        ratings_quantity: 31,
        price: 799.0,
        price_discount: 100.0,
        summary: "Sip your way through world-famous vineyards.",
        description: "Taste award-winning wines, learn pairing basics, and meet artisan vintners.",
        start_dates: ["2026-04-25", "2026-06-20"],
    },
    SampleTour {
        name: "The Star Gazer",
        duration: 5,
        max_group_size: 12,
        difficulty: Difficulty::Easy,
        ratings_average: 4.9,
        ratings_quantity: 18,
        price: 499.0,
        price_discount: 0.0,
        summary: "Night skies, telescopes, and desert tranquility.",
        description: "Camp in remote landscapes, learn astronomy basics, and photograph the Milky Way.",
        start_dates: ["2026-09-15", "2026-10-10"],
    },
    SampleTour {
        name: "The Northern Lights",
        duration: 7,
        max_group_size: 10,
        difficulty: Difficulty::Difficult,
        ratings_average: 4.7,
        ratings_quantity: 16,
        price: 1299.0,
        price_discount: 0.0,
        summary: "A winter expedition to chase the aurora.",
        description: "Snowmobile through arctic terrain, warm up in cabins, and witness epic auroras.",
        start_dates: ["2026-12-01", "2027-01-15"],
    },
];

impl SampleTour {
    fn to_tour(&self, index: usize) -> Tour {
        let n = index + 1;
        let created = now();
        Tour {
            id: new_id(),
            name: self.name.to_string(),
            slug: slugify(self.name),
            duration: self.duration,
            max_group_size: self.max_group_size,
            difficulty: self.difficulty,
            ratings_average: self.ratings_average,
            ratings_quantity: self.ratings_quantity,
            price: self.price,
            price_discount: (self.price_discount > 0.0).then_some(self.price_discount),
            summary: self.summary.to_string(),
            description: self.description.to_string(),
            image_cover: Some(format!("/img/tours/tour-{n}-cover.jpg")),
            images: (1..=3)
                .map(|i| format!("/img/tours/tour-{n}-{i}.jpg"))
                .collect(),
            start_dates: self.start_dates.iter().map(|d| d.to_string()).collect(),
            secret_tour: false,
            start_location: None,
            locations: vec![],
            guides: vec![],
            created_at: created,
            updated_at: created,
        }
    }
}

impl Database {
    /// Fill an empty catalogue with the sample tours. A catalogue that
    /// already holds anything is left alone.
    pub async fn seed_sample_tours(&self) -> Result<SeedReport, AppError> {
        let mut conn = self.conn.lock().await;
        let existing: i64 = conn.query_row("SELECT COUNT(*) FROM tours", [], |row| row.get(0))?;
        if existing > 0 {
            info!("[DB] Seed skipped, {existing} tours already present");
            return Ok(SeedReport {
                created: 0,
                skipped: true,
            });
        }

        let tx = conn.transaction()?;
        for (index, sample) in SAMPLE_TOURS.iter().enumerate() {
            write_tour(&tx, &sample.to_tour(index), true)?;
        }
        tx.commit()?;

        info!("[DB] Seeded {} sample tours", SAMPLE_TOURS.len());
        Ok(SeedReport {
            created: SAMPLE_TOURS.len(),
            skipped: false,
        })
    }
}

//! The fixed demo dataset: ten movies, their index schema, and synonyms.
use serde::Serialize;
use std::collections::BTreeMap;

pub const PRIMARY_KEY: &str = "id";

/// Fields contributing to full-text relevance, in ranking order.
pub const SEARCHABLE_ATTRIBUTES: [&str; 3] = ["title", "overview", "genres"];

/// Fields usable in filter expressions.
pub const FILTERABLE_ATTRIBUTES: [&str; 3] = ["genres", "release_date", "rating"];

/// Directed synonym expansion: each key expands to its listed terms only.
pub type SynonymMap = BTreeMap<String, Vec<String>>;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Document {
    pub id: u32,
    pub title: String,
    pub overview: String,
    pub genres: Vec<String>,
    /// Unix epoch seconds.
    pub release_date: i64,
    pub rating: f64,
}

fn movie(
    id: u32,
    title: &str,
    overview: &str,
    genres: &[&str],
    release_date: i64,
    rating: f64,
) -> Document {
    Document {
        id,
        title: title.to_string(),
        overview: overview.to_string(),
        genres: genres.iter().map(|genre| genre.to_string()).collect(),
        release_date,
        rating,
    }
}

/// The documents in submission order.
pub fn movies() -> Vec<Document> {
    vec![
        movie(
            1,
            "Carol",
            "In 1950s New York, a department-store clerk who dreams of a better life falls for an older, married woman.",
            &["Romance", "Drama"],
            1448582400,
            7.2,
        ),
        movie(
            2,
            "Wonder Woman",
            "An Amazon princess comes to the world of Man in the grips of the First World War to confront the forces of evil and bring an end to human conflict.",
            &["Action", "Adventure", "Fantasy"],
            1496361600,
            7.5,
        ),
        movie(
            3,
            "Life of Pi",
            "After a shipwreck, a young man adrift in the ocean aboard a lifeboat shares his small craft with an adult Bengal tiger.",
            &["Adventure", "Drama", "Fantasy"],
            1353542400,
            7.9,
        ),
        movie(
            4,
            "Mad Max: Fury Road",
            "In a post-apocalyptic wasteland, a woman rebels against a tyrannical ruler in search for her homeland with the aid of a group of female prisoners, a psychotic worshiper, and a drifter named Max.",
            &["Action", "Adventure", "Science Fiction"],
            1431648000,
            8.1,
        ),
        movie(
            5,
            "Moana",
            "In Ancient Polynesia, when a terrible curse incurred by the Demigod Maui reaches Moana's island, she answers the Ocean's call to seek out the Demigod to set things right.",
            &["Animation", "Family", "Adventure"],
            1479859200,
            7.6,
        ),
        movie(
            6,
            "Philadelphia",
            "Two competing lawyers join forces to sue a prestigious law firm for AIDS discrimination. As their unlikely friendship develops, their courage overcomes the prejudice and corruption of their powerful adversaries.",
            &["Drama"],
            758505600,
            7.7,
        ),
        movie(
            7,
            "Inception",
            "A thief who steals corporate secrets through the use of dream-sharing technology is given the inverse task of planting an idea into the mind of a C.E.O.",
            &["Action", "Science Fiction", "Adventure"],
            1279238400,
            8.3,
        ),
        movie(
            8,
            "The Shawshank Redemption",
            "Framed in the 1940s for the double murder of his wife and her lover, upstanding banker Andy Dufresne begins a new life at the Shawshank prison, where he puts his accounting skills to work for an amoral warden.",
            &["Drama", "Crime"],
            780278400,
            8.7,
        ),
        movie(
            9,
            "Parasite",
            "All unemployed, Ki-taek's family takes peculiar interest in the wealthy and glamorous Parks for their livelihood until they get entangled in an unexpected incident.",
            &["Comedy", "Thriller", "Drama"],
            1557964800,
            8.5,
        ),
        movie(
            10,
            "Your Name",
            "High schoolers Mitsuha and Taki are complete strangers living separate lives. But one night, they suddenly switch places. Mitsuha wakes up in Taki's body, and he in hers. This bizarre occurrence continues to happen randomly, and the two must adjust their lives around each other.",
            &["Romance", "Animation", "Drama"],
            1470960000,
            8.4,
        ),
    ]
}

/// Synonyms with both directions spelled out.
pub fn synonyms() -> SynonymMap {
    let entries: [(&str, &[&str]); 4] = [
        ("great", &["fantastic", "excellent"]),
        ("fantastic", &["great", "excellent"]),
        ("sci-fi", &["science fiction"]),
        ("science fiction", &["sci-fi"]),
    ];
    entries
        .into_iter()
        .map(|(term, expansions)| {
            let expansions = expansions.iter().map(|term| term.to_string()).collect();
            (term.to_string(), expansions)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn movie_ids_are_unique_and_ordered() {
        let ids: Vec<u32> = movies().iter().map(|doc| doc.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
        let unique: BTreeSet<u32> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn documents_serialize_with_snake_case_release_date() {
        let value = serde_json::to_value(&movies()[0]).expect("serialize");
        assert_eq!(value["release_date"], 1448582400);
        assert_eq!(value["genres"], serde_json::json!(["Romance", "Drama"]));
        assert!(value.get("releaseDate").is_none());
    }

    #[test]
    fn filterable_attributes_match_document_fields() {
        let value = serde_json::to_value(&movies()[0]).expect("serialize");
        for field in FILTERABLE_ATTRIBUTES.iter().chain(SEARCHABLE_ATTRIBUTES.iter()) {
            assert!(value.get(*field).is_some(), "missing field {field}");
        }
        assert!(value.get(PRIMARY_KEY).is_some());
    }

    #[test]
    fn synonyms_are_not_symmetrized() {
        let map = synonyms();
        assert_eq!(map.len(), 4);
        assert_eq!(map["sci-fi"], vec!["science fiction".to_string()]);
        assert_eq!(map["science fiction"], vec!["sci-fi".to_string()]);
        // "excellent" is an expansion target only.
        assert!(!map.contains_key("excellent"));
    }
}

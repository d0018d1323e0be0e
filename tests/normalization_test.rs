use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use trip_planner_rs::{
    services::fallback_image_url, ImageLookup, NormalizeError, Normalizer, PlannerError,
};

#[derive(Debug)]
struct FixedImage(&'static str);

#[async_trait]
impl ImageLookup for FixedImage {
    async fn find_image(&self, _query: &str) -> trip_planner_rs::Result<Option<String>> {
        Ok(Some(self.0.to_string()))
    }
}

#[derive(Debug)]
struct BrokenImage;

#[async_trait]
impl ImageLookup for BrokenImage {
    async fn find_image(&self, query: &str) -> trip_planner_rs::Result<Option<String>> {
        Err(PlannerError::ImageLookup(format!("{query}: connection reset")))
    }
}

/// Tracks how many lookups are in flight at once.
#[derive(Debug, Default)]
struct SlowImage {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl ImageLookup for SlowImage {
    async fn find_image(&self, _query: &str) -> trip_planner_rs::Result<Option<String>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(None)
    }
}

const FENCED: &str = r#"Here is your plan!

```json
{
  "destination": "Kyoto",
  "days": [
    {
      "day": "Day 1",
      "activities": [
        {"title": "Fushimi Inari", "cost": "Free", "duration": "2-3 hours", "tags": "Temples"},
        {"name": "Nishiki Market", "cost": "$25 approx", "duration_hours": 1.5}
      ]
    }
  ]
}
```

Enjoy your trip, and let me know if you want changes."#;

#[tokio::test]
async fn test_fenced_response_is_extracted_and_repaired() {
    let parsed = Normalizer::default().parse_response(FENCED, "Kyoto").await;

    assert!(!parsed.is_degraded());
    let itinerary = parsed.itinerary;
    assert_eq!(itinerary.city, "Kyoto");
    assert_eq!(itinerary.days.len(), 1);
    assert_eq!(itinerary.days[0].day_number, 1);

    let shrine = &itinerary.days[0].activities[0];
    assert_eq!(shrine.name, "Fushimi Inari");
    assert_eq!(shrine.cost, 0.0);
    assert_eq!(shrine.duration_hours, 2.0);
    assert_eq!(shrine.duration_str, "2-3 hours");
    assert_eq!(shrine.tags, vec!["Temples"]);
    assert_eq!(shrine.description, "Fushimi Inari");

    let market = &itinerary.days[0].activities[1];
    assert_eq!(market.cost, 25.0);
    assert_eq!(market.duration_hours, 1.5);
    assert_eq!(market.duration_str, "1.5 hours");
    assert_eq!(market.tags, vec!["General"]);
    assert_eq!(itinerary.total_cost(), 25.0);
    assert!(!itinerary.valid);
}

#[tokio::test]
async fn test_renormalization_is_idempotent() {
    let normalizer = Normalizer::new(Arc::new(FixedImage("https://img.example.com/x.jpg")));
    let first = normalizer.parse_response(FENCED, "Kyoto").await.itinerary;

    let reserialized = serde_json::to_string(&first).unwrap();
    let second = normalizer.parse_response(&reserialized, "Kyoto").await.itinerary;

    assert_eq!(first.days.len(), second.days.len());
    for (a, b) in first.activities().zip(second.activities()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.cost, b.cost);
        assert_eq!(a.duration_hours, b.duration_hours);
        assert_eq!(a.duration_str, b.duration_str);
        assert_eq!(a.tags, b.tags);
        assert_eq!(a.description, b.description);
    }
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_model_supplied_images_are_replaced() {
    let raw = json!({
        "city": "Rome",
        "days": [{
            "day_number": 1,
            "activities": [{
                "name": "Colosseum",
                "cost": 18,
                "image_url": "https://hallucinated.example/colosseum.png"
            }]
        }]
    })
    .to_string();

    let found = Normalizer::new(Arc::new(FixedImage("https://img.example.com/colosseum.jpg")))
        .parse_response(&raw, "Rome")
        .await
        .itinerary;
    assert_eq!(
        found.days[0].activities[0].image_url.as_deref(),
        Some("https://img.example.com/colosseum.jpg")
    );

    let fallback = Normalizer::default().parse_response(&raw, "Rome").await.itinerary;
    let url = fallback.days[0].activities[0].image_url.clone().unwrap();
    assert!(url.contains("Colosseum"));
    assert!(url.contains("Rome"));
    assert_eq!(url, fallback_image_url("Colosseum Rome"));
}

#[tokio::test]
async fn test_failed_lookup_uses_fallback() {
    let raw = r#"{"city": "Rome", "days": [{"activities": [{"name": "Pantheon"}]}]}"#;
    let itinerary = Normalizer::new(Arc::new(BrokenImage))
        .parse_response(raw, "Rome")
        .await
        .itinerary;

    let url = itinerary.days[0].activities[0].image_url.as_deref().unwrap();
    assert_eq!(url, fallback_image_url("Pantheon Rome"));
}

#[tokio::test]
async fn test_image_lookups_run_concurrently() {
    let lookup = Arc::new(SlowImage::default());
    let raw = json!({
        "city": "Rome",
        "days": [
            {"day_number": 1, "activities": [{"name": "A"}, {"name": "B"}]},
            {"day_number": 2, "activities": [{"name": "C"}, {"name": "D"}]}
        ]
    })
    .to_string();

    let itinerary = Normalizer::new(lookup.clone())
        .parse_response(&raw, "Rome")
        .await
        .itinerary;

    assert!(lookup.peak.load(Ordering::SeqCst) > 1);
    assert_eq!(lookup.in_flight.load(Ordering::SeqCst), 0);
    assert!(itinerary.activities().all(|a| a.image_url.is_some()));
}

#[tokio::test]
async fn test_nested_envelope_is_unwrapped() {
    let raw = json!({
        "response": {
            "itinerary": {
                "days": [{"day_number": 1, "activities": [{"name": "Rijksmuseum", "cost": 22.5}]}]
            }
        }
    })
    .to_string();

    let parsed = Normalizer::default().parse_response(&raw, "Amsterdam").await;
    assert!(!parsed.is_degraded());
    assert_eq!(parsed.itinerary.days[0].activities[0].name, "Rijksmuseum");
    assert_eq!(parsed.itinerary.total_cost(), 22.5);
}

#[tokio::test]
async fn test_degradations_are_expected_and_typed() {
    let normalizer = Normalizer::default();

    let prose = normalizer
        .parse_response("I'm sorry, I can't plan that trip.", "Oslo")
        .await;
    assert!(matches!(prose.degradation, Some(NormalizeError::Parse(_))));
    assert_eq!(prose.itinerary.city, "Oslo");
    assert!(prose.itinerary.days.is_empty());

    let wrong_shape = normalizer
        .parse_response(r#"{"city": "Oslo", "days": "three days of fjords"}"#, "Oslo")
        .await;
    assert!(matches!(
        wrong_shape.degradation,
        Some(NormalizeError::ShapeMismatch { .. })
    ));
    assert!(wrong_shape.degradation.unwrap().is_expected());
    assert_eq!(wrong_shape.itinerary.city, "Oslo");
    assert!(wrong_shape.itinerary.days.is_empty());
}

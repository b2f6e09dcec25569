//! HTTP-level tests against the router with in-process fake models.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use birdid::context::AppContext;
use birdid::inference::{BirdClassifier, Detection, ImageModel, SubjectDetector};
use birdid::metadata::{MetadataWriter, WriteOutcome};
use birdid::server;
use birdid::species::{KnowledgeBase, SpeciesNames, SpeciesRecord, SpeciesTable};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::{Array4, Axis};
use serde_json::{Value, json};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Logits are the per-channel means of the preprocessed tensor, so they
/// depend only on pixel content.
struct ChannelMeans;

impl ImageModel for ChannelMeans {
    fn forward(&self, input: Array4<f32>) -> birdid::Result<Vec<f32>> {
        Ok(input
            .axis_iter(Axis(1))
            .map(|channel| channel.mean().unwrap_or(0.0))
            .collect())
    }
}

#[derive(Clone, Default)]
struct CountingDetector {
    calls: Arc<AtomicUsize>,
}

impl SubjectDetector for CountingDetector {
    #[allow(clippy::cast_precision_loss)]
    fn detect(&self, image: &DynamicImage) -> birdid::Result<Option<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Detection {
            x1: 10.0,
            y1: 10.0,
            x2: image.width() as f32 / 2.0,
            y2: image.height() as f32 / 2.0,
            confidence: 0.75,
        }))
    }
}

#[derive(Clone, Default)]
struct RecordingWriter {
    writes: Arc<Mutex<Vec<(PathBuf, String)>>>,
}

impl MetadataWriter for RecordingWriter {
    fn write_title(&self, path: &Path, title: &str) -> WriteOutcome {
        if !path.is_file() {
            return WriteOutcome::failure(format!("file not found: {}", path.display()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((path.to_path_buf(), title.to_string()));
        WriteOutcome::success(format!("wrote title '{title}'"))
    }

    fn write_caption(&self, path: &Path, caption: &str) -> WriteOutcome {
        self.write_title(path, caption)
    }
}

struct Harness {
    app: Router,
    detector: CountingDetector,
    writer: RecordingWriter,
    dir: tempfile::TempDir,
}

fn names(cn: &str, en: &str, sci: &str) -> SpeciesNames {
    SpeciesNames {
        cn_name: cn.to_string(),
        en_name: en.to_string(),
        scientific_name: sci.to_string(),
    }
}

fn harness() -> Harness {
    let species = SpeciesTable::from_entries(vec![
        names("白头鹎", "Light-vented Bulbul", "Pycnonotus sinensis"),
        names("麻雀", "Eurasian Tree Sparrow", "Passer montanus"),
        names("喜鹊", "Oriental Magpie", "Pica serica"),
    ]);
    let knowledge = KnowledgeBase::from_records(vec![SpeciesRecord {
        model_class_id: Some(0),
        english_name: "Light-vented Bulbul".to_string(),
        chinese_simplified: "白头鹎".to_string(),
        chinese_traditional: "白頭鵯".to_string(),
        scientific_name: "Pycnonotus sinensis".to_string(),
        ebird_code: "livbul1".to_string(),
        short_description_zh: "常见留鸟".to_string(),
        full_description_zh: "常见留鸟，城市公园多见。".to_string(),
        regions: vec!["Asia".to_string()],
    }]);

    let detector = CountingDetector::default();
    let writer = RecordingWriter::default();
    let context = AppContext::builder(species)
        .classifier(BirdClassifier::new(ChannelMeans))
        .knowledge_base(knowledge)
        .detector(detector.clone())
        .metadata_writer(writer.clone())
        .build();

    Harness {
        app: server::router(Arc::new(context)),
        detector,
        writer,
        dir: tempfile::tempdir().unwrap(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    }))
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, format).unwrap();
    bytes.into_inner()
}

/// Little-endian TIFF holding a GPS IFD for 39°54'27"N 116°23'50"E.
fn gps_tiff() -> Vec<u8> {
    fn entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: [u8; 4]) {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&value);
    }

    let mut out = b"II".to_vec();
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    entry(&mut out, 0x8825, 4, 1, 26u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    entry(&mut out, 0x0001, 2, 2, [b'N', 0, 0, 0]);
    entry(&mut out, 0x0002, 5, 3, 80u32.to_le_bytes());
    entry(&mut out, 0x0003, 2, 2, [b'E', 0, 0, 0]);
    entry(&mut out, 0x0004, 5, 3, 104u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    for value in [39u32, 54, 27, 116, 23, 50] {
        out.extend_from_slice(&value.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
    }
    out
}

/// JPEG with an EXIF APP1 segment spliced in after SOI.
fn jpeg_with_gps(image: &DynamicImage) -> Vec<u8> {
    let jpeg = encode(image, ImageFormat::Jpeg);
    let tiff = gps_tiff();
    let length = u16::try_from(2 + 6 + tiff.len()).unwrap();

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

impl Harness {
    fn write_file(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn post(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }
}

fn confidences(body: &Value) -> Vec<f64> {
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["confidence"].as_f64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_reports_capabilities() {
    let h = harness();
    let (status, body) = h.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "SuperBirdID API");
    assert_eq!(body["yolo_available"], true);
    assert_eq!(body["ebird_available"], false);

    let (_, again) = h.get("/health").await;
    assert_eq!(body, again);
}

#[tokio::test]
async fn test_recognize_by_path() {
    let h = harness();
    let path = h.write_file("bird.png", &encode(&photo(120, 80), ImageFormat::Png));

    let (status, body) = h
        .post("/recognize", &json!({"image_path": path, "top_k": 2}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert!(body["yolo_info"].is_null());
    assert!(body["gps_info"].is_null());

    let scores = confidences(&body);
    assert_eq!(scores.len(), 2);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(scores.iter().all(|c| *c > 0.0 && *c <= 100.0));
    assert_eq!(body["results"][0]["rank"], 1);
    assert_eq!(body["results"][1]["rank"], 2);
}

#[tokio::test]
async fn test_default_top_k_is_three() {
    let h = harness();
    let path = h.write_file("bird.png", &encode(&photo(32, 32), ImageFormat::Png));
    let (_, body) = h.post("/recognize", &json!({"image_path": path})).await;
    assert_eq!(confidences(&body).len(), 3);
}

#[tokio::test]
async fn test_base64_and_path_agree() {
    let h = harness();
    let png = encode(&photo(200, 150), ImageFormat::Png);
    let path = h.write_file("bird.png", &png);

    let (_, by_path) = h.post("/recognize", &json!({"image_path": path})).await;
    let (status, by_base64) = h
        .post(
            "/recognize",
            &json!({"image_base64": format!("data:image/png;base64,{}", STANDARD.encode(&png))}),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{by_base64}");
    assert_eq!(by_path["results"], by_base64["results"]);
}

#[tokio::test]
async fn test_inference_is_stateless() {
    let h = harness();
    let first = h.write_file("first.png", &encode(&photo(64, 64), ImageFormat::Png));
    let other = h.write_file(
        "other.png",
        &encode(
            &DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([250, 5, 5]))),
            ImageFormat::Png,
        ),
    );

    let (_, before) = h.post("/recognize", &json!({"image_path": first})).await;
    let _ = h.post("/recognize", &json!({"image_path": other})).await;
    let (_, after) = h.post("/recognize", &json!({"image_path": first})).await;
    assert_eq!(before["results"], after["results"]);
}

#[tokio::test]
async fn test_request_errors() {
    let h = harness();

    let (status, body) = h.post("/recognize", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body.get("traceback").is_none());

    let (status, _) = h
        .post("/recognize", &json!({"image_path": "/nonexistent/bird.jpg"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h
        .post("/recognize", &json!({"image_base64": "%%% not base64 %%%"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h
        .send(
            Request::post("/recognize")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_top_k_above_limit_is_rejected() {
    let h = harness();
    let path = h.write_file("bird.png", &encode(&photo(64, 48), ImageFormat::Png));

    let (status, body) = h
        .post("/recognize", &json!({"image_path": path, "top_k": 200}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid request body: top_k must be at most 100");
}

#[tokio::test]
async fn test_null_use_yolo_skips_detector() {
    let h = harness();
    let path = h.write_file("large.png", &encode(&photo(900, 600), ImageFormat::Png));

    let (status, body) = h
        .post("/recognize", &json!({"image_path": path, "use_yolo": null}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["yolo_info"].is_null());
    assert_eq!(h.detector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_small_image_skips_detector() {
    let h = harness();
    let path = h.write_file("small.png", &encode(&photo(640, 480), ImageFormat::Png));

    let (status, body) = h
        .post("/recognize", &json!({"image_path": path, "use_yolo": true}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["yolo_info"].is_null());
    assert_eq!(h.detector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_large_image_reports_crop() {
    let h = harness();
    let path = h.write_file("large.png", &encode(&photo(900, 600), ImageFormat::Png));

    let (_, body) = h.post("/recognize", &json!({"image_path": path})).await;
    assert_eq!(h.detector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        body["yolo_info"],
        "YOLO detection: confidence 0.750, crop size 470x320"
    );
}

#[tokio::test]
async fn test_gps_metadata_is_reported() {
    let h = harness();
    let path = h.write_file("geotagged.jpg", &jpeg_with_gps(&photo(96, 64)));

    let (status, body) = h.post("/recognize", &json!({"image_path": path})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let gps = &body["gps_info"];
    assert!((gps["latitude"].as_f64().unwrap() - 39.9075).abs() < 1e-6);
    assert_eq!(gps["region"], "Asia");
    assert_eq!(gps["country"], "CN");
    assert!(gps["info"].as_str().unwrap().starts_with("GPS: 39.907500"));

    let bulbul = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["cn_name"] == "白头鹎")
        .unwrap();
    assert_eq!(bulbul["ebird_match"], true);
    assert_eq!(bulbul["description"], "常见留鸟");

    let (_, without) = h
        .post("/recognize", &json!({"image_path": path, "use_gps": false}))
        .await;
    assert!(without["gps_info"].is_null());
    assert!(
        without["results"]
            .as_array()
            .unwrap()
            .iter()
            .all(|r| r["ebird_match"] == false)
    );
}

#[tokio::test]
async fn test_bird_info() {
    let h = harness();

    let (status, body) = h.get("/bird/info?cn_name=%E7%99%BD%E5%A4%B4%E9%B9%8E").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["info"]["scientific_name"], "Pycnonotus sinensis");
    assert_eq!(body["info"]["ebird_code"], "livbul1");

    let (status, _) = h.get("/bird/info?cn_name=unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = h.get("/bird/info").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing required parameter: cn_name");
}

#[tokio::test]
async fn test_exif_writes_delegate_to_writer() {
    let h = harness();
    let path = h.write_file("bird.jpg", &encode(&photo(16, 16), ImageFormat::Jpeg));

    let (status, body) = h
        .post(
            "/exif/write-title",
            &json!({"image_path": path, "bird_name": "白头鹎"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        h.writer.writes.lock().unwrap().as_slice(),
        &[(path.clone(), "白头鹎".to_string())]
    );

    let (status, body) = h
        .post(
            "/exif/write-caption",
            &json!({"image_path": "/nonexistent.jpg", "caption": "常见留鸟"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);

    let (status, _) = h
        .post("/exif/write-caption", &json!({"image_path": path}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_classifier_is_unavailable() {
    let app = server::router(Arc::new(AppContext::builder(SpeciesTable::default()).build()));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bird.png");
    std::fs::write(&path, encode(&photo(8, 8), ImageFormat::Png)).unwrap();

    let response = app
        .oneshot(
            Request::post("/recognize")
                .body(Body::from(json!({"image_path": path}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let h = harness();
    let (status, body) = h.get("/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[cfg(test)]
mod tests {
    use crate::components::ComponentStatus;
    use crate::config::ServerConfig;
    use crate::handlers::CarHealthResponse;
    use crate::router::create_router;
    use crate::state::ServerState;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use doppler_rs::{encode_wav, PassGeometry, Synthesizer, SynthesizerConfig};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "doppler-test-boundary";

    // Helper function to create a test router with a temporary upload directory
    fn create_test_router() -> (axum::Router, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = ServerConfig {
            upload_directory: temp_dir.path().to_path_buf(),
            pass_duration: 6.0,
            ..ServerConfig::default()
        };
        let router = create_router(Arc::new(ServerState::new(config)));
        (router, temp_dir)
    }

    // Helper function to send a request and get the raw response
    async fn send_raw(
        router: axum::Router,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = router
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body.to_vec())
    }

    // Helper function to send a request and get the response as JSON
    async fn send_request(
        router: axum::Router,
        request: Request<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let (status, _, body) = send_raw(router, request).await;
        let json: serde_json::Value =
            serde_json::from_slice(&body).unwrap_or(serde_json::json!({}));
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    enum Part<'a> {
        File {
            name: &'a str,
            filename: &'a str,
            data: &'a [u8],
        },
        Text {
            name: &'a str,
            value: &'a str,
        },
    }

    fn post_multipart(uri: &str, parts: &[Part]) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::File {
                    name,
                    filename,
                    data,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n",
                            name, filename
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
                Part::Text { name, value } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                            name, value
                        )
                        .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn synthesized_wav(frequency: f64, speed: f64) -> Vec<u8> {
        let geometry = PassGeometry {
            duration: 6.0,
            ..PassGeometry::default()
        };
        let synthesizer = Synthesizer::new(geometry, SynthesizerConfig::default()).unwrap();
        encode_wav(&synthesizer.synthesize(frequency, speed).unwrap()).unwrap()
    }

    fn upload_dir_is_empty(dir: &TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    // =========================================================================
    // HEALTH
    // =========================================================================

    #[tokio::test]
    async fn test_root_welcome() {
        let (router, _temp) = create_test_router();
        let (status, json) = send_request(router, get("/")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Welcome to the Doppler signal API");
    }

    #[tokio::test]
    async fn test_health_check() {
        let (router, _temp) = create_test_router();
        let (status, json) = send_request(router, get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        assert!(json["uptime_seconds"].is_u64());
    }

    #[tokio::test]
    async fn test_car_health_loads_components() {
        let (router, _temp) = create_test_router();
        let (status, json) = send_request(router, get("/api/car/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["sound_generator_available"], true);
        assert_eq!(json["sound_analyzer_available"], true);
        assert_eq!(json["components"]["sound_generator"]["state"], "loaded");
        assert_eq!(json["components"]["sound_analyzer"]["state"], "loaded");
    }

    #[tokio::test]
    async fn test_car_health_body_deserializes() {
        let (router, _temp) = create_test_router();
        let (status, json) = send_request(router, get("/api/car/health")).await;
        assert_eq!(status, StatusCode::OK);

        let health: CarHealthResponse = serde_json::from_value(json).unwrap();
        assert_eq!(health.status, "healthy");
        assert!(health.sound_analyzer_available);
        assert_eq!(
            health.components.get("sound_analyzer"),
            Some(&ComponentStatus::Loaded)
        );
        assert_eq!(
            health.components.get("sound_generator"),
            Some(&ComponentStatus::Loaded)
        );
    }

    #[tokio::test]
    async fn test_car_health_reports_load_failure() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            upload_directory: temp_dir.path().to_path_buf(),
            acceptance_percentile: 150.0,
            ..ServerConfig::default()
        };
        let router = create_router(Arc::new(ServerState::new(config)));
        let (status, json) = send_request(router, get("/api/car/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["sound_generator_available"], true);
        assert_eq!(json["sound_analyzer_available"], false);
        assert_eq!(json["components"]["sound_analyzer"]["state"], "load_failed");
        assert!(json["components"]["sound_analyzer"]["error"].is_string());
    }

    #[tokio::test]
    async fn test_car_test_lists_endpoints() {
        let (router, _temp) = create_test_router();
        let (status, json) = send_request(router, get("/api/car/test")).await;

        assert_eq!(status, StatusCode::OK);
        let endpoints = json["endpoints"].as_array().unwrap();
        assert!(endpoints.iter().any(|e| e == "/api/car/generate-sound"));
        assert!(endpoints.iter().any(|e| e == "/api/car/analyze-sound"));
    }

    // =========================================================================
    // GENERATE
    // =========================================================================

    #[tokio::test]
    async fn test_generate_sound_returns_wav() {
        let (router, _temp) = create_test_router();
        let request = post_json(
            "/api/car/generate-sound",
            serde_json::json!({"velocity": 30.0, "frequency": 120.0}),
        );
        let (status, headers, body) = send_raw(router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "audio/wav");
        assert!(headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("doppler_saturated_tone.wav"));
        assert_eq!(&body[0..4], b"RIFF");
        // 6 s at 44.1 kHz, 16-bit mono
        assert_eq!(body.len(), 44 + 264_600 * 2);
    }

    #[tokio::test]
    async fn test_generate_sound_rejects_out_of_range() {
        for body in [
            serde_json::json!({"velocity": 150.0, "frequency": 120.0}),
            serde_json::json!({"velocity": -5.0, "frequency": 120.0}),
            serde_json::json!({"velocity": 30.0, "frequency": 5.0}),
            serde_json::json!({"velocity": 30.0, "frequency": 5000.0}),
        ] {
            let (router, _temp) = create_test_router();
            let (status, _, body) =
                send_raw(router, post_json("/api/car/generate-sound", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(String::from_utf8(body).unwrap().contains("must be between"));
        }
    }

    #[tokio::test]
    async fn test_generate_sound_rejects_malformed_json() {
        let (router, _temp) = create_test_router();
        let (status, _) = send_request(
            router,
            post_json("/api/car/generate-sound", serde_json::json!({"speed": 30})),
        )
        .await;
        assert!(status.is_client_error());
    }

    // =========================================================================
    // ANALYZE
    // =========================================================================

    #[tokio::test]
    async fn test_analyze_sound_recovers_speed() {
        let (router, temp) = create_test_router();
        let wav = synthesized_wav(150.0, 25.0);
        let request = post_multipart(
            "/api/car/analyze-sound",
            &[
                Part::File {
                    name: "audio",
                    filename: "pass.wav",
                    data: &wav,
                },
                Part::Text {
                    name: "expected_frequency",
                    value: "150",
                },
            ],
        );
        let (status, json) = send_request(router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["plot_format"], "svg");
        assert_eq!(json["velocity_stats"]["data_quality"], "high");
        assert_eq!(json["velocity_stats"]["source_frequency_hz"], 150.0);
        let speed = json["velocity_stats"]["avg_speed_ms"].as_f64().unwrap();
        assert!((speed - 25.0).abs() <= 25.0 * 0.15, "estimate {}", speed);
        assert!(upload_dir_is_empty(&temp));
    }

    #[tokio::test]
    async fn test_analyze_sound_cancelled_request_leaves_no_upload() {
        let (router, temp) = create_test_router();
        let geometry = PassGeometry {
            duration: 60.0,
            ..PassGeometry::default()
        };
        let synthesizer = Synthesizer::new(geometry, SynthesizerConfig::default()).unwrap();
        let wav = encode_wav(&synthesizer.synthesize(150.0, 25.0).unwrap()).unwrap();
        let request = post_multipart(
            "/api/car/analyze-sound",
            &[Part::File {
                name: "audio",
                filename: "long-pass.wav",
                data: &wav,
            }],
        );

        // Drop the request future while the analysis is still running
        let _ = tokio::time::timeout(Duration::from_millis(300), router.oneshot(request)).await;

        let mut waited = Duration::ZERO;
        while !upload_dir_is_empty(&temp) && waited < Duration::from_secs(120) {
            tokio::time::sleep(Duration::from_millis(100)).await;
            waited += Duration::from_millis(100);
        }
        assert!(upload_dir_is_empty(&temp), "upload left behind after cancellation");
    }

    #[tokio::test]
    async fn test_analyze_sound_rejects_unsupported_file() {
        let (router, temp) = create_test_router();
        let request = post_multipart(
            "/api/car/analyze-sound",
            &[Part::File {
                name: "audio",
                filename: "pass.mp3",
                data: b"ID3",
            }],
        );
        let (status, _, body) = send_raw(router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(body).unwrap().contains("Unsupported"));
        assert!(upload_dir_is_empty(&temp));
    }

    #[tokio::test]
    async fn test_analyze_sound_rejects_undecodable_wav() {
        let (router, temp) = create_test_router();
        let request = post_multipart(
            "/api/car/analyze-sound",
            &[Part::File {
                name: "audio",
                filename: "broken.wav",
                data: b"not audio at all",
            }],
        );
        let (status, _, body) = send_raw(router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(body).unwrap().contains("Could not decode"));
        assert!(upload_dir_is_empty(&temp));
    }

    #[tokio::test]
    async fn test_analyze_sound_requires_audio_field() {
        let (router, _temp) = create_test_router();
        let request = post_multipart(
            "/api/car/analyze-sound",
            &[Part::Text {
                name: "expected_frequency",
                value: "120",
            }],
        );
        let (status, _) = send_request(router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_sound_rejects_bad_expected_frequency() {
        let (router, _temp) = create_test_router();
        let wav = synthesized_wav(120.0, 20.0);
        let request = post_multipart(
            "/api/car/analyze-sound",
            &[
                Part::Text {
                    name: "expected_frequency",
                    value: "-120",
                },
                Part::File {
                    name: "audio",
                    filename: "pass.wav",
                    data: &wav,
                },
            ],
        );
        let (status, _) = send_request(router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_sound_unavailable_analyzer() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            upload_directory: temp_dir.path().to_path_buf(),
            fallback_correction: 0.0,
            ..ServerConfig::default()
        };
        let router = create_router(Arc::new(ServerState::new(config)));
        let wav = synthesized_wav(120.0, 20.0);
        let request = post_multipart(
            "/api/car/analyze-sound",
            &[Part::File {
                name: "audio",
                filename: "pass.wav",
                data: &wav,
            }],
        );
        let (status, _) = send_request(router, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    // =========================================================================
    // AUDIO SUMMARY
    // =========================================================================

    #[tokio::test]
    async fn test_audio_summary() {
        let (router, temp) = create_test_router();
        let wav = synthesized_wav(150.0, 10.0);
        let request = post_multipart(
            "/api/audio/analyze",
            &[Part::File {
                name: "file",
                filename: "pass.wav",
                data: &wav,
            }],
        );
        let (status, json) = send_request(router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["filename"], "pass.wav");
        assert_eq!(json["sample_rate"], 44100);
        assert_eq!(json["channels"], "Mono");
        assert_eq!(json["duration_seconds"], 6.0);
        assert_eq!(json["doppler_detected"], true);
        assert!(upload_dir_is_empty(&temp));
    }

    #[tokio::test]
    async fn test_audio_summary_requires_file_field() {
        let (router, _temp) = create_test_router();
        let wav = synthesized_wav(150.0, 10.0);
        let request = post_multipart(
            "/api/audio/analyze",
            &[Part::File {
                name: "audio",
                filename: "pass.wav",
                data: &wav,
            }],
        );
        let (status, _) = send_request(router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

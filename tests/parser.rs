//! Track decoding tests against GPX and JSON inputs.

mod common;

use summit_detector::parser::{decode_gpx, decode_json};
use summit_detector::{parse_track, SummitError, TrackFormat};

const GPX_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="tests" xmlns="http://www.topografix.com/GPX/1/1">"#;

fn gpx_doc(body: &str) -> String {
    format!("{}\n{}\n</gpx>", GPX_HEADER, body)
}

#[test]
fn test_sniff_format() {
    assert_eq!(TrackFormat::sniff(b"  \n<?xml"), Some(TrackFormat::Gpx));
    assert_eq!(TrackFormat::sniff(b"[{\"lat\":1}]"), Some(TrackFormat::Json));
    assert_eq!(TrackFormat::sniff(b"\xEF\xBB\xBF{\"points\":[]}"), Some(TrackFormat::Json));
    assert_eq!(TrackFormat::sniff(b"   \t\n"), None);
    assert_eq!(TrackFormat::sniff(b""), None);
}

#[test]
fn test_gpx_track_points() {
    let gpx = gpx_doc(
        r#"<trk><trkseg>
            <trkpt lat="46.5" lon="7.9"><ele>1200.5</ele><time>2024-07-01T08:00:00Z</time></trkpt>
            <trkpt lat="46.501" lon="7.9"><ele>1210</ele><time>2024-07-01T08:01:00Z</time></trkpt>
        </trkseg></trk>"#,
    );
    let points = parse_track(gpx.as_bytes()).unwrap();

    assert_eq!(points.len(), 2);
    assert_eq!(points[0].latitude, 46.5);
    assert_eq!(points[0].longitude, 7.9);
    assert_eq!(points[0].elevation, Some(1200.5));
    assert_eq!(points[0].cumulative_distance, 0.0);
    assert_eq!(points[0].instantaneous_speed, 0.0);
    // 0.001 degrees of latitude is ~111m, covered in 60s
    assert!((points[1].cumulative_distance - 111.19).abs() < 0.1);
    assert!((points[1].instantaneous_speed - 1.853).abs() < 0.01);
}

#[test]
fn test_gpx_multiple_segments_concatenated() {
    let gpx = gpx_doc(
        r#"<trk>
            <trkseg><trkpt lat="46.0" lon="8.0"/><trkpt lat="46.001" lon="8.0"/></trkseg>
            <trkseg><trkpt lat="46.002" lon="8.0"/></trkseg>
        </trk>
        <trk><trkseg><trkpt lat="46.003" lon="8.0"/></trkseg></trk>"#,
    );
    let points = parse_track(gpx.as_bytes()).unwrap();
    assert_eq!(points.len(), 4);
    let indices: Vec<usize> = points.iter().map(|p| p.sequence_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[test]
fn test_gpx_missing_elevation_and_time() {
    let gpx = gpx_doc(
        r#"<trk><trkseg>
            <trkpt lat="46.0" lon="8.0"><time>2024-07-01T08:00:00Z</time></trkpt>
            <trkpt lat="46.001" lon="8.0"><ele>900</ele></trkpt>
            <trkpt lat="46.002" lon="8.0"><ele>905</ele><time>2024-07-01T08:02:00Z</time></trkpt>
        </trkseg></trk>"#,
    );
    let points = parse_track(gpx.as_bytes()).unwrap();

    assert_eq!(points[0].elevation, None);
    assert!(points[0].timestamp.is_some());
    assert_eq!(points[1].timestamp, None);
    // No time on either side of the step: speed stays 0
    assert_eq!(points[1].instantaneous_speed, 0.0);
    assert_eq!(points[2].instantaneous_speed, 0.0);
    assert!(points[2].cumulative_distance > points[1].cumulative_distance);
}

#[test]
fn test_gpx_route_fallback() {
    let gpx = gpx_doc(
        r#"<rte>
            <rtept lat="46.0" lon="8.0"><ele>100</ele></rtept>
            <rtept lat="46.001" lon="8.0"><ele>110</ele></rtept>
        </rte>"#,
    );
    let fixes = decode_gpx(gpx.as_bytes()).unwrap();
    assert_eq!(fixes.len(), 2);
    assert_eq!(fixes[1].elevation, Some(110.0));
}

#[test]
fn test_gpx_tracks_take_precedence_over_routes() {
    let gpx = gpx_doc(
        r#"<rte><rtept lat="10.0" lon="10.0"/></rte>
        <trk><trkseg><trkpt lat="46.0" lon="8.0"/><trkpt lat="46.1" lon="8.0"/></trkseg></trk>"#,
    );
    let fixes = decode_gpx(gpx.as_bytes()).unwrap();
    assert_eq!(fixes.len(), 2);
    assert_eq!(fixes[0].latitude, 46.0);
}

#[test]
fn test_gpx_without_points_is_empty_track() {
    let gpx = gpx_doc("<metadata><name>nothing here</name></metadata>");
    assert_eq!(parse_track(gpx.as_bytes()), Err(SummitError::EmptyTrack));
}

#[test]
fn test_malformed_gpx_is_parse_error() {
    let result = parse_track(b"<gpx version=\"1.1\"><trk><trkseg><trkpt lat=");
    assert!(matches!(result, Err(SummitError::Parse { .. })));

    let result = parse_track(b"this is not a track file");
    assert!(matches!(result, Err(SummitError::Parse { .. })));
}

#[test]
fn test_empty_input_is_empty_track() {
    assert_eq!(parse_track(b""), Err(SummitError::EmptyTrack));
    assert_eq!(parse_track(b"  \n\n "), Err(SummitError::EmptyTrack));
}

#[test]
fn test_json_bare_and_wrapped() {
    let bare = br#"[
        {"lat": 46.0, "lon": 8.0, "ele": 500, "time": "2024-07-01T08:00:00Z"},
        {"latitude": 46.001, "lng": 8.0, "elevation": 510}
    ]"#;
    let fixes = decode_json(bare).unwrap();
    assert_eq!(fixes.len(), 2);
    assert_eq!(fixes[1].elevation, Some(510.0));
    assert_eq!(fixes[1].time, None);

    let wrapped = br#"{"points": [{"lat": 46.0, "lon": 8.0}]}"#;
    let points = parse_track(wrapped).unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].elevation, None);
}

#[test]
fn test_json_errors() {
    assert_eq!(parse_track(b"[]"), Err(SummitError::EmptyTrack));
    assert!(matches!(
        parse_track(br#"[{"lat": "north"}]"#),
        Err(SummitError::Parse { .. })
    ));
    assert!(matches!(parse_track(b"[{"), Err(SummitError::Parse { .. })));
}

#[test]
fn test_gpx_and_json_produce_same_track() {
    let track = common::scenario_b();
    let from_gpx = parse_track(track.gpx().as_bytes()).unwrap();
    let from_json = parse_track(track.json().as_bytes()).unwrap();

    assert_eq!(from_gpx.len(), from_json.len());
    for (g, j) in from_gpx.iter().zip(&from_json) {
        assert!((g.latitude - j.latitude).abs() < 1e-8);
        assert_eq!(g.elevation, j.elevation);
        assert_eq!(g.timestamp, j.timestamp);
        assert!((g.instantaneous_speed - j.instantaneous_speed).abs() < 0.01);
    }
}

#[test]
fn test_nan_elevation_does_not_poison_scores() {
    let gpx = gpx_doc(
        r#"<trk><trkseg>
            <trkpt lat="46.5" lon="7.9"><ele>NaN</ele><time>2024-07-01T08:00:00Z</time></trkpt>
            <trkpt lat="46.5" lon="7.9"><ele>900</ele><time>2024-07-01T08:01:00Z</time></trkpt>
            <trkpt lat="46.5" lon="7.9"><ele>900</ele><time>2024-07-01T08:03:00Z</time></trkpt>
        </trkseg></trk>"#,
    );
    let points = parse_track(gpx.as_bytes()).unwrap();
    assert_eq!(points[0].elevation, None);

    let result =
        summit_detector::detect_peaks(gpx.as_bytes(), &summit_detector::DetectionConfig::default())
            .unwrap();
    assert_eq!(result.peaks.len(), 1);
    let peak = &result.peaks[0];
    assert_eq!(peak.elevation, 900.0);
    assert_eq!(peak.average_elevation, 900.0);
    for v in [
        peak.score,
        peak.duration_score,
        peak.elevation_score,
        peak.prominence_score,
        peak.prominence,
    ] {
        assert!(v.is_finite());
    }
    assert!((0.0..=100.0).contains(&peak.score));
}

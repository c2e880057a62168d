//! Tiled queries against a remote cone-search service.
//!
//! The service accepts one circular field per request, no wider than its
//! maximum radius. A region wider than that is covered by a hexagonal
//! lattice of sub-circles ("tiles") laid out in the tangent plane around
//! the region center: rows 1.5 tile radii apart, columns `sqrt(3)` radii
//! apart, odd rows offset by half a column. That lattice's covering
//! radius is exactly one tile radius, so the union of tiles covers the
//! region; tiles overlap, and objects returned by more than one tile are
//! deduplicated by designation, first occurrence wins.
//!
//! Responses are HTML-framed fixed-column text:
//!
//! ```text
//! <pre>
//!  Object designation        R.A.       Decl.     V     Comment
//! --------------------------------------------------------------
//!  (12345) 1998 XY12        12 34 56.7 -05 43 21  17.2  ...
//! </pre>
//! ```
//!
//! A body with `No known objects` inside the frame is an empty result. A
//! line starting with `Error` or a frame missing its header or `</pre>`
//! terminator raises [`ScanError::QueryFailed`]: the connection worked
//! but the answer is unusable, and silently returning a truncated result
//! set would be worse than failing. The engine never retries on its own.

use std::collections::{HashSet, VecDeque};

use chrono::NaiveDate;

use starscan_coords::{offset_by, Angle, Coor};

use crate::codec::col;
use crate::error::{ScanError, ScanResult};
use crate::region::SkyRegion;
use crate::scan::{ScanCursor, StarScan};
use crate::star::CatalogStar;

/// Faint limit sent when the caller sets no magnitude ceiling.
const DEFAULT_LIMIT_MAG: f64 = 22.0;

/// One cone request, ready for the transport to format onto the wire.
#[derive(Debug, Clone)]
pub struct TileRequest {
    pub center: Coor,
    pub radius: Angle,
    /// Observation date the ephemeris is computed for.
    pub date: NaiveDate,
    /// Faintest magnitude the service should report.
    pub limit_mag: f64,
}

/// The network seam. One implementation speaks HTTP; tests answer from
/// canned strings.
pub trait RemoteTransport: Send {
    fn query(&self, request: &TileRequest) -> ScanResult<String>;
}

/// Blocking HTTP POST transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> ScanResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("starscan-catalog/{}", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|err| ScanError::query_failed(format!("http client: {err}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl RemoteTransport for HttpTransport {
    fn query(&self, request: &TileRequest) -> ScanResult<String> {
        let params = [
            ("ra", format!("{:.6}", request.center.ra().degrees())),
            ("decl", format!("{:.6}", request.center.dec().degrees())),
            ("radius", format!("{:.2}", request.radius.arcminutes())),
            ("date", request.date.format("%Y-%m-%d").to_string()),
            ("limit", format!("{:.1}", request.limit_mag)),
        ];
        let response = self
            .client
            .post(&self.url)
            .form(&params)
            .send()
            .map_err(|err| ScanError::query_failed(format!("request failed: {err}")))?;
        if !response.status().is_success() {
            return Err(ScanError::query_failed(format!(
                "service answered {}",
                response.status()
            )));
        }
        response
            .text()
            .map_err(|err| ScanError::query_failed(format!("unreadable response: {err}")))
    }
}

/// Tile centers covering the cap of `region_radius` around `center`,
/// each tile a circle of `tile_radius`. A region no wider than one tile
/// is covered by a single tile at the center.
pub(crate) fn tile_centers(center: &Coor, region_radius: Angle, tile_radius: Angle) -> Vec<Coor> {
    let cap = region_radius.degrees();
    let r = tile_radius.degrees();
    if cap <= r {
        return vec![*center];
    }

    let col_step = libm::sqrt(3.0) * r;
    let row_step = 1.5 * r;
    // A tile center further than cap + r from the region center cannot
    // cover any region point.
    let reach = cap + r;
    let rows = libm::ceil(reach / row_step) as i64;
    let cols = libm::ceil(reach / col_step) as i64 + 1;

    let mut tiles = Vec::new();
    for k in -rows..=rows {
        let y = k as f64 * row_step;
        let half = if k.rem_euclid(2) == 1 { 0.5 } else { 0.0 };
        for j in -cols..=cols {
            let x = (j as f64 + half) * col_step;
            let dist = libm::hypot(x, y);
            if dist > reach {
                continue;
            }
            if dist == 0.0 {
                tiles.push(*center);
                continue;
            }
            // Lattice coordinates are in the azimuthal-equidistant plane
            // around the region center: distances from the center map to
            // the sphere exactly, pairwise distances only shrink, so the
            // plane lattice's covering radius carries over.
            let bearing = Angle::from_radians(libm::atan2(x, y));
            if let Ok(tile) = offset_by(center, bearing, Angle::from_degrees(dist)) {
                tiles.push(tile);
            }
        }
    }
    tiles
}

pub struct TiledRemoteScanner {
    catalog: &'static str,
    transport: Box<dyn RemoteTransport>,
    max_tile_radius: Angle,
    date: NaiveDate,
    ceiling: Option<f64>,
    region: Option<SkyRegion>,
    tiles: VecDeque<Coor>,
    pending: VecDeque<CatalogStar>,
    seen: HashSet<String>,
    cursor: ScanCursor,
}

impl TiledRemoteScanner {
    pub fn new(
        catalog: &'static str,
        transport: Box<dyn RemoteTransport>,
        max_tile_radius: Angle,
        date: NaiveDate,
    ) -> Self {
        Self {
            catalog,
            transport,
            max_tile_radius,
            date,
            ceiling: None,
            region: None,
            tiles: VecDeque::new(),
            pending: VecDeque::new(),
            seen: HashSet::new(),
            cursor: ScanCursor::default(),
        }
    }

    pub fn set_magnitude_ceiling(&mut self, ceiling: Option<f64>) {
        self.ceiling = ceiling;
    }

    pub fn cursor(&self) -> ScanCursor {
        self.cursor
    }

    /// Queries one tile and stages its survivors.
    fn fetch_tile(&mut self, tile: Coor, region: &SkyRegion) -> ScanResult<()> {
        let request = TileRequest {
            center: tile,
            radius: self.max_tile_radius,
            date: self.date,
            limit_mag: self.ceiling.unwrap_or(DEFAULT_LIMIT_MAG),
        };
        log::debug!(
            "{}: querying tile {} of {} at {}",
            self.catalog,
            self.cursor.block + 1,
            self.cursor.block + 1 + self.tiles.len(),
            tile
        );
        let body = self.transport.query(&request)?;
        let rows = parse_response(self.catalog, &body)?;

        for star in rows {
            self.cursor.ordinal += 1;
            // Overlapping tiles return border objects repeatedly; the
            // first occurrence of a designation wins.
            if !self.seen.insert(star.name.clone()) {
                continue;
            }
            if !region.contains(&star.coor) {
                continue;
            }
            if !star.passes_ceiling(self.ceiling) {
                continue;
            }
            self.pending.push_back(star);
        }
        self.cursor.block += 1;
        Ok(())
    }
}

impl StarScan for TiledRemoteScanner {
    fn open(&mut self, center: Coor, field_of_view: Angle) -> ScanResult<()> {
        let region = SkyRegion::new(center, field_of_view);
        if region.is_all_sky() {
            return Err(ScanError::query_failed(
                "field of view too wide for a tiled remote query",
            ));
        }
        self.tiles = tile_centers(&center, region.radius(), self.max_tile_radius)
            .into_iter()
            .collect();
        log::debug!(
            "{}: region of {:.3} deg covered by {} tile(s)",
            self.catalog,
            region.radius().degrees(),
            self.tiles.len()
        );
        self.region = Some(region);
        self.pending.clear();
        self.seen.clear();
        self.cursor = ScanCursor::default();
        Ok(())
    }

    fn read_next(&mut self) -> ScanResult<Option<CatalogStar>> {
        let Some(region) = self.region else {
            return Err(ScanError::query_failed("scan is not open"));
        };
        loop {
            if let Some(star) = self.pending.pop_front() {
                self.cursor.record += 1;
                return Ok(Some(star));
            }
            let Some(tile) = self.tiles.pop_front() else {
                self.cursor.exhausted = true;
                return Ok(None);
            };
            self.fetch_tile(tile, &region)?;
        }
    }

    fn close(&mut self) -> ScanResult<()> {
        self.region = None;
        self.tiles.clear();
        self.pending.clear();
        self.seen.clear();
        self.cursor = ScanCursor::default();
        Ok(())
    }
}

/// Extracts result rows from one HTML-framed response body.
fn parse_response(catalog: &'static str, body: &str) -> ScanResult<Vec<CatalogStar>> {
    let mut in_frame = false;
    let mut header_seen = false;
    let mut rule_seen = false;
    let mut terminated = false;
    let mut empty_marker = false;
    let mut stars = Vec::new();

    for line in body.lines() {
        let trimmed = line.trim();
        if let Some(message) = trimmed.strip_prefix("Error") {
            return Err(ScanError::query_failed(format!(
                "service error:{}",
                message.trim_start_matches(':')
            )));
        }
        if !in_frame {
            if trimmed.starts_with("<pre>") {
                in_frame = true;
            }
            continue;
        }
        if trimmed.starts_with("</pre>") {
            terminated = true;
            break;
        }
        if trimmed.contains("No known objects") {
            empty_marker = true;
            continue;
        }
        if !header_seen {
            if trimmed.starts_with("Object designation") {
                header_seen = true;
            }
            continue;
        }
        if !rule_seen {
            if trimmed.starts_with('-') {
                rule_seen = true;
            }
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        match parse_row(line) {
            Some(star) => stars.push(star),
            None => log::debug!("{catalog}: skipping malformed response row"),
        }
    }

    if !terminated {
        return Err(ScanError::query_failed(
            "response truncated before the closing marker",
        ));
    }
    if empty_marker {
        return Ok(Vec::new());
    }
    if !header_seen || !rule_seen {
        return Err(ScanError::query_failed(
            "response frame is missing the result header",
        ));
    }
    Ok(stars)
}

/// One result row. Columns: designation 1..26, RA `hh mm ss.s` 26..36,
/// declination `sdd mm ss` 37..46, V magnitude 46..52 (blank when
/// unmeasured), free-form comment after.
fn parse_row(line: &str) -> Option<CatalogStar> {
    let raw = line.as_bytes();

    let name = col(raw, 1, 26)?.trim();
    if name.is_empty() {
        return None;
    }

    let ra_hours = col(raw, 26, 28)?.trim().parse::<f64>().ok()?;
    let ra_minutes = col(raw, 29, 31)?.trim().parse::<f64>().ok()?;
    let ra_seconds = col(raw, 32, 36)?.trim().parse::<f64>().ok()?;

    let dec_sign = if col(raw, 37, 38)? == "-" { -1.0 } else { 1.0 };
    let dec_degrees = col(raw, 38, 40)?.trim().parse::<f64>().ok()?;
    let dec_minutes = col(raw, 41, 43)?.trim().parse::<f64>().ok()?;
    let dec_seconds = col(raw, 44, 46)?.trim().parse::<f64>().ok()?;

    let ra = ra_hours + ra_minutes / 60.0 + ra_seconds / 3600.0;
    let dec = dec_sign * (dec_degrees + dec_minutes / 60.0 + dec_seconds / 3600.0);
    let coor = Coor::from_hours_degrees(ra, dec).ok()?;

    let mut star = CatalogStar::new(name, coor);
    star.mag = col(raw, 46, 52)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok());
    Some(star)
}

#[cfg(test)]
mod tests {
    use super::*;
    use starscan_coords::angular_separation;
    use std::sync::{Arc, Mutex};

    /// Answers every tile with the same canned body and records the
    /// requests it saw.
    struct FakeTransport {
        body: String,
        requests: Arc<Mutex<Vec<TileRequest>>>,
    }

    impl FakeTransport {
        fn new(body: &str) -> Self {
            Self {
                body: body.to_string(),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Handle that stays readable after the transport is boxed away.
        fn request_log(&self) -> Arc<Mutex<Vec<TileRequest>>> {
            Arc::clone(&self.requests)
        }
    }

    impl RemoteTransport for FakeTransport {
        fn query(&self, request: &TileRequest) -> ScanResult<String> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.body.clone())
        }
    }

    fn row(name: &str, ra: (u32, u32, f64), dec: (char, u32, u32, u32), mag: &str) -> String {
        format!(
            " {:<25}{:>2} {:>2} {:>4.1} {}{:02} {:02} {:02}{:>6}",
            name, ra.0, ra.1, ra.2, dec.0, dec.1, dec.2, dec.3, mag
        )
    }

    fn framed(rows: &[String]) -> String {
        let mut body = String::from(
            "<html><body>\n<pre>\n Object designation        R.A.       Decl.     V     Comment\n",
        );
        body.push_str(&"-".repeat(62));
        body.push('\n');
        for r in rows {
            body.push_str(r);
            body.push('\n');
        }
        body.push_str("</pre>\n</body></html>\n");
        body
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2004, 7, 13).unwrap()
    }

    fn scanner(body: &str, tile_radius_deg: f64) -> TiledRemoteScanner {
        TiledRemoteScanner::new(
            "MPCheck",
            Box::new(FakeTransport::new(body)),
            Angle::from_degrees(tile_radius_deg),
            date(),
        )
    }

    #[test]
    fn test_single_tile_when_region_fits() {
        let body = framed(&[row("(1) Ceres", (12, 30, 0.0), ('-', 5, 15, 0), "  17.2")]);
        let mut scan = scanner(&body, 1.0);
        let center = Coor::from_hours_degrees(12.5, -5.25).unwrap();

        let stars = scan.read_all(center, Angle::from_degrees(1.0)).unwrap();
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].name, "(1) Ceres");
        assert_eq!(stars[0].mag, Some(17.2));
        assert!((stars[0].coor.ra().degrees() - 187.5).abs() < 1e-9);
    }

    #[test]
    fn test_cross_tile_duplicates_collapse() {
        // Every tile reports the same two objects, as a corner object
        // seen by overlapping tiles would be.
        let body = framed(&[
            row("1998 XY12", (2, 0, 0.0), ('+', 10, 0, 0), "  18.0"),
            row("1998 XY12", (2, 0, 0.0), ('+', 10, 0, 0), "  18.0"),
        ]);
        let mut scan = scanner(&body, 0.5);
        let center = Coor::from_hours_degrees(2.0, 10.0).unwrap();

        // fov 3 deg -> radius 1.5 deg: several tiles of radius 0.5.
        let stars = scan.read_all(center, Angle::from_degrees(3.0)).unwrap();
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].name, "1998 XY12");
    }

    #[test]
    fn test_requests_carry_tile_radius_and_date() {
        let body = framed(&[]);
        let transport = FakeTransport::new(&body);
        let log = transport.request_log();
        let mut scan = TiledRemoteScanner::new(
            "MPCheck",
            Box::new(transport),
            Angle::from_degrees(0.5),
            date(),
        );
        scan.set_magnitude_ceiling(Some(19.5));

        let center = Coor::from_degrees(100.0, 20.0).unwrap();
        let stars = scan.read_all(center, Angle::from_degrees(2.0)).unwrap();
        assert!(stars.is_empty());

        let requests = log.lock().unwrap();
        assert!(requests.len() > 1, "1 deg cap over 0.5 deg tiles");
        for req in requests.iter() {
            assert!((req.radius.arcminutes() - 30.0).abs() < 1e-9);
            assert_eq!(req.date, date());
            assert!((req.limit_mag - 19.5).abs() < f64::EPSILON);
            let reach = angular_separation(&center, &req.center).degrees();
            assert!(reach <= 1.5 + 1e-9, "tile {reach} deg out");
        }
    }

    #[test]
    fn test_lattice_covers_the_region() {
        // Every sampled point of the region must fall inside at least
        // one tile, and single-tile regions collapse to one request.
        for (ra, dec, cap, tile) in [
            (30.0, 45.0, 2.5, 1.0),
            (10.0, -88.5, 3.0, 1.0),
            (200.0, 0.0, 5.0, 0.75),
        ] {
            let center = Coor::from_degrees(ra, dec).unwrap();
            let tiles = tile_centers(&center, Angle::from_degrees(cap), Angle::from_degrees(tile));
            assert!(!tiles.is_empty());

            for bearing_deg in (0..360).step_by(15) {
                for step in 0..=10 {
                    let dist = cap * step as f64 / 10.0;
                    let point = offset_by(
                        &center,
                        Angle::from_degrees(bearing_deg as f64),
                        Angle::from_degrees(dist),
                    )
                    .unwrap();
                    let covered = tiles.iter().any(|t| {
                        angular_separation(t, &point).degrees() <= tile + 1e-9
                    });
                    assert!(
                        covered,
                        "point at bearing {bearing_deg}, dist {dist:.2} uncovered \
                         (center {ra},{dec}, cap {cap}, tile {tile})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_fitting_region_uses_one_tile() {
        let center = Coor::from_degrees(30.0, 45.0).unwrap();
        let tiles = tile_centers(&center, Angle::from_degrees(0.8), Angle::from_degrees(1.0));
        assert_eq!(tiles.len(), 1);
    }

    #[test]
    fn test_truncated_response_is_query_failed() {
        let mut body = framed(&[row("(1) Ceres", (12, 30, 0.0), ('-', 5, 15, 0), "  17.2")]);
        body.truncate(body.find("</pre>").unwrap());

        let mut scan = scanner(&body, 1.0);
        let center = Coor::from_hours_degrees(12.5, -5.25).unwrap();
        let err = scan.read_all(center, Angle::from_degrees(1.0)).unwrap_err();
        assert!(matches!(err, ScanError::QueryFailed { .. }));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_no_known_objects_is_empty_not_error() {
        let body = "<pre>\nNo known objects were found in the field.\n</pre>\n";
        let mut scan = scanner(body, 1.0);
        let center = Coor::from_degrees(10.0, 10.0).unwrap();
        let stars = scan.read_all(center, Angle::from_degrees(1.0)).unwrap();
        assert!(stars.is_empty());
    }

    #[test]
    fn test_service_error_marker_is_query_failed() {
        let body = "<html>\nError: date is out of ephemeris range\n</html>\n";
        let mut scan = scanner(body, 1.0);
        let center = Coor::from_degrees(10.0, 10.0).unwrap();
        let err = scan.read_all(center, Angle::from_degrees(1.0)).unwrap_err();
        assert!(matches!(err, ScanError::QueryFailed { .. }));
        assert!(err.to_string().contains("ephemeris range"));
    }

    #[test]
    fn test_rows_outside_region_are_dropped() {
        // Tiles overreach the region; an object 2 degrees out must not
        // leak through.
        let body = framed(&[
            row("inside", (2, 0, 0.0), ('+', 10, 0, 0), "  18.0"),
            row("outside", (2, 0, 0.0), ('+', 12, 0, 0), "  18.0"),
        ]);
        let mut scan = scanner(&body, 1.0);
        let center = Coor::from_hours_degrees(2.0, 10.0).unwrap();
        let stars = scan.read_all(center, Angle::from_degrees(1.0)).unwrap();
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].name, "inside");
    }

    #[test]
    fn test_magnitude_ceiling_filters_and_rides_the_request() {
        let body = framed(&[
            row("bright", (2, 0, 0.0), ('+', 10, 0, 0), "  15.0"),
            row("faint", (2, 0, 1.0), ('+', 10, 0, 5), "  19.9"),
        ]);
        let mut scan = scanner(&body, 1.0);
        scan.set_magnitude_ceiling(Some(16.0));
        let center = Coor::from_hours_degrees(2.0, 10.0).unwrap();
        let stars = scan.read_all(center, Angle::from_degrees(1.0)).unwrap();
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].name, "bright");
    }

    #[test]
    fn test_missing_header_is_query_failed() {
        let body = "<pre>\nsomething unexpected\n</pre>\n";
        let mut scan = scanner(body, 1.0);
        let center = Coor::from_degrees(10.0, 10.0).unwrap();
        let err = scan.read_all(center, Angle::from_degrees(1.0)).unwrap_err();
        assert!(matches!(err, ScanError::QueryFailed { .. }));
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn test_negative_low_declination_row() {
        // -00 05 00: the sign lives on a zero degree field.
        let body = framed(&[row("low", (5, 0, 0.0), ('-', 0, 5, 0), "  16.0")]);
        let mut scan = scanner(&body, 1.0);
        let center = Coor::from_hours_degrees(5.0, -0.0833).unwrap();
        let stars = scan.read_all(center, Angle::from_degrees(1.0)).unwrap();
        assert_eq!(stars.len(), 1);
        assert!((stars[0].coor.dec().degrees() + 5.0 / 60.0).abs() < 1e-9);
    }
}

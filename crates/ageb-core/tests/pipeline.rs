//! End-to-end run over a small synthetic fixture spanning both modeled
//! states.

use ageb_core::{
    run_pipeline, AreaCatalog, AreaUnitRow, AssignerConfig, AssignmentResult, CentroidRow,
    CentroidTable, CorrectionPass, MethodTag, PostalNormalizer, SourceRecord, SpatialLocator,
};

// ── Fixture ──────────────────────────────────────────────────────────────────

fn cell(code: &str, urbanicity: &str, col: usize) -> AreaUnitRow {
    let lon = |k: usize| -99.20 + k as f64 * 0.01;
    let (x0, x1, y0, y1) = (lon(col), lon(col + 1), 19.30, 19.31);
    AreaUnitRow {
        code: code.into(),
        state: code[..2].into(),
        municipality: code[2..5].trim_start_matches('0').into(),
        urbanicity: urbanicity.into(),
        geometry_wkt: format!("POLYGON(({x0} {y0}, {x1} {y0}, {x1} {y1}, {x0} {y1}, {x0} {y0}))"),
    }
}

fn bare(code: &str, urbanicity: &str) -> AreaUnitRow {
    AreaUnitRow {
        code: code.into(),
        state: code[..2].into(),
        municipality: code[2..5].into(),
        urbanicity: urbanicity.into(),
        geometry_wkt: "EMPTY".into(),
    }
}

fn areas() -> Vec<AreaUnitRow> {
    vec![
        cell("0900700010010", "Urbana", 0),
        cell("0900700010025", "Rural", 1),
        cell("0900700010031", "Urbana", 2),
        cell("0900700010046", "Rural", 3),
        cell("0901500010012", "Urbana", 4),
        cell("0901500010027", "Urbana", 5),
        bare("1503300010010", "Urbana"),
        bare("1503300010021", "Urbana"),
        bare("1503300010036", "Urbana"),
        bare("1505800010014", "Rural"),
        // Outside the modeled regions.
        bare("1412000010010", "Urbana"),
    ]
}

fn centroids() -> Vec<CentroidRow> {
    let row = |cp: &str, col: usize| CentroidRow {
        postal_code: cp.into(),
        latitude: 19.305,
        longitude: -99.195 + col as f64 * 0.01,
        state_name: Some("CIUDAD DE MEXICO".into()),
    };
    vec![
        row("6000", 0),
        row("06010", 1),
        row("06020", 2),
        row("06030", 3),
        row("06040", 4),
        row("06050", 9),
    ]
}

fn records() -> Vec<SourceRecord> {
    let postal = ["06000", "6010", "06020", "6020", "06040", "06050", "99999", "", "."];
    let hoods = ["Centro", "Roma Norte", "", "Del Valle", "nan"];
    (0..60)
        .map(|i| {
            let (state, admin) = match i % 4 {
                0 => ("Ciudad de Mexico", "7"),
                1 => ("Ciudad de Mexico", "09015"),
                2 => ("Mexico", "33"),
                _ => ("Estado de Mexico", "999"),
            };
            SourceRecord {
                id: format!("REC-{i:03}"),
                state_name: if i == 59 { "Jalisco".into() } else { state.into() },
                municipality_name: String::new(),
                neighborhood: Some(hoods[i % hoods.len()].into()),
                postal_code: Some(postal[i % postal.len()].into()),
                admin_id: Some(admin.into()),
                existing_code: (i == 10).then(|| "090070001".into()),
            }
        })
        .collect()
}

fn fixture(config: &AssignerConfig) -> (AreaCatalog, CentroidTable) {
    let catalog = AreaCatalog::from_rows(&areas(), config).unwrap();
    let centroids = CentroidTable::from_rows(&centroids(), config).unwrap();
    (catalog, centroids)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn fixture_loads_modeled_regions_only() {
    let cfg = AssignerConfig::default();
    let (catalog, centroids) = fixture(&cfg);
    assert_eq!(catalog.units.len(), 10);
    assert_eq!(catalog.stats.outside_region, 1);
    assert_eq!(catalog.stats.geometry_failures, 4);
    assert!(centroids.lookup("06000").is_some());
}

#[test]
fn pipeline_is_deterministic() {
    let cfg = AssignerConfig::default();
    let (catalog, centroids) = fixture(&cfg);
    let records = records();

    let first = run_pipeline(&records, &catalog, &centroids, &cfg).unwrap();
    let second = run_pipeline(&records, &catalog, &centroids, &cfg).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.results.len(), records.len());
    assert_eq!(first.diagnostics.overlapping_pairs, 0);
}

#[test]
fn final_results_are_urban_canonical_or_unresolved() {
    let cfg = AssignerConfig::default();
    let (catalog, centroids) = fixture(&cfg);
    let records = records();
    let out = run_pipeline(&records, &catalog, &centroids, &cfg).unwrap();

    let pass = CorrectionPass::new(&catalog.units, &cfg);
    for (rec, res) in out.records.iter().zip(&out.results) {
        if rec.state_name == "Jalisco" {
            assert_eq!(res, &AssignmentResult::unresolved());
        } else {
            assert!(pass.is_valid(res), "{} -> {:?}", rec.id, res);
        }
    }
    // No 4-character postal code survives.
    assert!(out
        .records
        .iter()
        .filter_map(|r| r.postal_code.as_deref())
        .all(|cp| cp.chars().count() != 4));
}

#[test]
fn repair_passes_are_idempotent() {
    let cfg = AssignerConfig::default();
    let (catalog, centroids) = fixture(&cfg);
    let records = records();
    let out = run_pipeline(&records, &catalog, &centroids, &cfg).unwrap();

    let (corrected, diag) = CorrectionPass::new(&catalog.units, &cfg)
        .apply(&out.records, &out.results)
        .unwrap();
    assert_eq!(corrected, out.results);
    assert_eq!(diag.corrections_applied, 0);

    let urban = SpatialLocator::build(catalog.units.iter().filter(|u| u.is_urban()), false);
    let again = PostalNormalizer::new(&cfg, &centroids, &urban)
        .apply(&out.records, &out.results)
        .unwrap();
    assert_eq!(again.records, out.records);
    assert_eq!(again.results, out.results);
    assert_eq!(again.diagnostics.postal_codes_normalized, 0);
}

#[test]
fn four_character_postal_codes_are_padded_and_retried() {
    let cfg = AssignerConfig::default();
    let (catalog, centroids) = fixture(&cfg);
    let records = records();
    let out = run_pipeline(&records, &catalog, &centroids, &cfg).unwrap();

    let i = records
        .iter()
        .position(|r| r.postal_code.as_deref() == Some("6010"))
        .unwrap();
    assert_eq!(out.records[i].postal_code.as_deref(), Some("06010"));
    // 06010 falls in a rural cell; the urban-only retry finds nothing and the
    // earlier result stands.
    assert_ne!(out.results[i].method, MethodTag::CorrectedSpatial);

    // 06020 falls in an urban cell, so the retry overrides the earlier tier.
    let i = records
        .iter()
        .position(|r| r.postal_code.as_deref() == Some("6020"))
        .unwrap();
    assert_eq!(out.records[i].postal_code.as_deref(), Some("06020"));
    assert_eq!(out.results[i].code, "0900700010031");
    assert_eq!(out.results[i].method, MethodTag::CorrectedSpatial);
    assert_eq!(out.results[i].coordinate, centroids.lookup("06020"));
    assert!(out.diagnostics.postal_codes_normalized > 0);
}

#[test]
fn spatial_hits_carry_their_centroid() {
    let cfg = AssignerConfig::default();
    let (catalog, centroids) = fixture(&cfg);
    let records = records();
    let out = run_pipeline(&records, &catalog, &centroids, &cfg).unwrap();

    for (rec, res) in records.iter().zip(&out.results) {
        if res.method == MethodTag::SpatialContainment {
            let cp = rec.postal_code.as_deref().unwrap();
            assert_eq!(res.coordinate, centroids.lookup(cp));
        }
    }
    assert!(out.diagnostics.count(MethodTag::SpatialContainment) > 0);
}

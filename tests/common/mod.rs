#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use datadelivery::config::DeliveryConfig;
use datadelivery::fits::header::HeaderValue;
use datadelivery::fits::writer::{FitsBuilder, TableColumn};
use datadelivery::missions::kepler_epochs::LONG_CADENCE_EPOCHS;
use serde_json::Value;
use tempfile::TempDir;

pub const KEPID: &str = "012644769";

/// Empty data tree; keep the `TempDir` alive for the duration of the test.
pub fn scratch_root() -> (TempDir, Utf8PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
    (tmp, root)
}

pub fn config_for(root: &Utf8Path) -> DeliveryConfig {
    DeliveryConfig {
        data_dir: root.to_path_buf(),
        ..DeliveryConfig::default()
    }
}

/// Light-curve file with the extension-1 layout shared by Kepler, K2 and TESS.
pub fn write_lightcurve(path: &Utf8Path, times: Vec<f64>, sap: Vec<f32>, pdcsap: Vec<f32>) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    FitsBuilder::new()
        .table(
            vec![
                ("BJDREFI".into(), HeaderValue::Int(2454833)),
                ("BJDREFF".into(), HeaderValue::Float(0.0)),
            ],
            vec![
                TableColumn::f64("TIME", times),
                TableColumn::f32("SAP_FLUX", sap),
                TableColumn::f32("PDCSAP_FLUX", pdcsap),
            ],
        )
        .write(path)
        .unwrap();
}

pub fn kepler_star_dir(root: &Utf8Path, kepid: &str) -> Utf8PathBuf {
    root.join("missions/kepler/lightcurves")
        .join(&kepid[..4])
        .join(kepid)
}

/// One long-cadence file per quarter, using the first epoch listed for each quarter.
///
/// Return
/// ----------
/// * The obsid requesting every written quarter.
pub fn write_kepler_long_cadence(root: &Utf8Path, kepid: &str) -> String {
    let dir = kepler_star_dir(root, kepid);
    for (quarter, epochs) in LONG_CADENCE_EPOCHS.iter().enumerate() {
        let t0 = 100.0 * quarter as f64;
        write_lightcurve(
            &dir.join(format!("kplr{kepid}-{}_llc.fits", epochs[0])),
            vec![t0, t0 + 0.02, t0 + 0.04],
            vec![1000.0, 1001.0, f32::NAN],
            vec![990.0, 991.0, 992.0],
        );
    }
    format!("kplr{kepid}_lc_Q{}", "1".repeat(LONG_CADENCE_EPOCHS.len()))
}

pub fn parse(json: &str) -> Vec<Value> {
    match serde_json::from_str(json).unwrap() {
        Value::Array(series) => series,
        other => panic!("response is not a list: {other}"),
    }
}

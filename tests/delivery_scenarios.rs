use approx::assert_relative_eq;
use datadelivery::delivery::{deliver_data, Delivery};
use datadelivery::delivery_errors::DeliveryError;
use datadelivery::mission::Mission;
use datadelivery::registry::Registry;
use datadelivery::request::Batch;

mod common;

use common::{config_for, parse, scratch_root, write_kepler_long_cadence, KEPID};

fn batch(missions: Vec<Mission>, obsids: Vec<&str>, filters: Option<Vec<&str>>) -> Batch {
    let owned = |values: Vec<&str>| values.into_iter().map(String::from).collect::<Vec<_>>();
    Batch::new(missions, owned(obsids), filters.map(owned), None, None).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_kepler_long_cadence_all_quarters() {
    let (_tmp, root) = scratch_root();
    let obsid = write_kepler_long_cadence(&root, KEPID);

    let delivery = Delivery::new(config_for(&root)).unwrap();
    let json = delivery
        .deliver(&batch(vec![Mission::Kepler], vec![&obsid], None))
        .await
        .unwrap();
    let series = parse(&json);

    assert_eq!(series.len(), 1);
    let kepler = &series[0];
    assert_eq!(kepler["errcode"], 0);
    assert_eq!(kepler["mission"], "kepler");
    assert_eq!(kepler["obsid"], obsid.as_str());
    assert!(kepler.get("is_ancillary").is_none());

    let labels = kepler["plot_labels"].as_array().unwrap();
    assert_eq!(labels.len(), 36);
    assert_eq!(labels[0], "KPLR_012644769 LC Q00 SAP");
    assert_eq!(labels[1], "KPLR_012644769 LC Q00 PDCSAP");
    assert_eq!(labels[35], "KPLR_012644769 LC Q17 PDCSAP");
    assert_eq!(kepler["xunits"].as_array().unwrap().len(), 36);
    assert_eq!(kepler["yunits"].as_array().unwrap().len(), 36);

    let sap = kepler["plot_series"][0].as_array().unwrap();
    let pdcsap = kepler["plot_series"][1].as_array().unwrap();
    assert_eq!(sap.len(), 2);
    assert_eq!(pdcsap.len(), 3);
    assert_relative_eq!(sap[0]["x"].as_f64().unwrap(), 2454833.0, epsilon = 1e-6);
    assert_relative_eq!(pdcsap[2]["y"].as_f64().unwrap(), 992.0, epsilon = 1e-6);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_short_cadence_served_from_cache() {
    let (_tmp, root) = scratch_root();
    let config = config_for(&root);
    let delivery = Delivery::new(config).unwrap();

    // no light-curve file exists: only the cache can answer
    let obsid = format!("kplr{KEPID}_sc_Q000000000000000001");
    let cached = r#"[{"errcode":0,"mission":"kepler","obsid":"precomputed"}]"#;
    delivery.cache().store(&obsid, cached).unwrap();

    let json = delivery
        .deliver(&batch(vec![Mission::Kepler], vec![&obsid], None))
        .await
        .unwrap();
    assert_eq!(json, cached);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cache_round_trip_is_byte_identical() {
    let (_tmp, root) = scratch_root();
    let lc_obsid = write_kepler_long_cadence(&root, KEPID);
    let delivery = Delivery::new(config_for(&root)).unwrap();

    let fresh = delivery
        .deliver(&batch(vec![Mission::Kepler], vec![&lc_obsid], None))
        .await
        .unwrap();

    let sc_obsid = format!("kplr{KEPID}_sc_Q000000000000000000");
    delivery.cache().store(&sc_obsid, &fresh).unwrap();
    let replayed = delivery
        .deliver(&batch(vec![Mission::Kepler], vec![&sc_obsid], None))
        .await
        .unwrap();
    assert_eq!(replayed, fresh);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_iue_missing_file() {
    let (_tmp, root) = scratch_root();
    let delivery = Delivery::new(config_for(&root)).unwrap();
    let json = delivery
        .deliver(&batch(vec![Mission::Iue], vec!["swp12345"], Some(vec!["HIGH_DISP"])))
        .await
        .unwrap();
    let series = parse(&json);
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["errcode"], 2);
    assert_eq!(series[0]["mission"], "iue");
    assert_eq!(series[0]["plot_series"].as_array().unwrap().len(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_galex_invalid_filter() {
    let (_tmp, root) = scratch_root();
    let delivery = Delivery::new(config_for(&root)).unwrap();
    let request = Batch::new(
        vec![Mission::Galex],
        vec!["2485946044208029696".to_string()],
        Some(vec!["XUV".to_string()]),
        Some(vec![
            "http://galex.stsci.edu/data/GR6/pipe/01-vsn/50280-GI1_009010_HD_52266/d/01-main/0001-img/07-try/qa/GI1_009010_HD_52266_0001-xd-int_2color.jpg"
                .to_string(),
        ]),
        None,
    )
    .unwrap();
    let series = parse(&delivery.deliver(&request).await.unwrap());
    assert_eq!(series[0]["errcode"], 4);
}

#[test]
fn test_oversized_response_replaced_by_single_error() {
    let (_tmp, root) = scratch_root();
    let obsid = write_kepler_long_cadence(&root, KEPID);
    let config = datadelivery::config::DeliveryConfig {
        max_response_chars: 500,
        ..config_for(&root)
    };

    let json = deliver_data(
        &batch(
            vec![Mission::Kepler, Mission::K2],
            vec![&obsid, "ktwo_bad"],
            None,
        ),
        config,
    )
    .unwrap();
    let series = parse(&json);
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["errcode"], 99);
    assert_eq!(series[0]["mission"], "k2, kepler");
    assert_eq!(series[0]["obsid"], format!("ktwo_bad, {obsid}").as_str());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_requests_fitting_alone_overflow_together() {
    let (_tmp, root) = scratch_root();
    // one failed K2 series serializes to about 110 characters
    let config = datadelivery::config::DeliveryConfig {
        max_response_chars: 150,
        ..config_for(&root)
    };
    let delivery = Delivery::new(config).unwrap();

    for obsid in ["ktwo_bad", "ktwo_worse"] {
        let alone = parse(
            &delivery
                .deliver(&batch(vec![Mission::K2], vec![obsid], None))
                .await
                .unwrap(),
        );
        assert_eq!(alone.len(), 1);
        assert_eq!(alone[0]["errcode"], 1);
    }

    let together = parse(
        &delivery
            .deliver(&batch(
                vec![Mission::K2, Mission::K2],
                vec!["ktwo_worse", "ktwo_bad"],
                None,
            ))
            .await
            .unwrap(),
    );
    assert_eq!(together.len(), 1);
    assert_eq!(together[0]["errcode"], 99);
    assert_eq!(together[0]["mission"], "k2, k2");
    assert_eq!(together[0]["obsid"], "ktwo_bad, ktwo_worse");
    assert_eq!(together[0]["plot_series"].as_array().unwrap().len(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_oversized_cache_entry_replaced_by_single_error() {
    let (_tmp, root) = scratch_root();
    let config = datadelivery::config::DeliveryConfig {
        max_response_chars: 20,
        ..config_for(&root)
    };
    let delivery = Delivery::new(config).unwrap();

    let obsid = format!("kplr{KEPID}_sc_Q000000000000000001");
    let cached = r#"[{"errcode":0,"mission":"kepler","obsid":"precomputed"}]"#;
    assert!(cached.chars().count() > 20);
    delivery.cache().store(&obsid, cached).unwrap();

    let series = parse(
        &delivery
            .deliver(&batch(vec![Mission::Kepler], vec![&obsid], None))
            .await
            .unwrap(),
    );
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["errcode"], 99);
    assert_eq!(series[0]["mission"], "kepler");
    assert_eq!(series[0]["obsid"], obsid.as_str());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_response_does_not_depend_on_input_order() {
    let (_tmp, root) = scratch_root();
    let obsid = write_kepler_long_cadence(&root, KEPID);
    let delivery = Delivery::new(config_for(&root)).unwrap();

    let forward = batch(
        vec![Mission::Kepler, Mission::Iue, Mission::K2, Mission::Kepler],
        vec![&obsid, "swp12345", "ktwo_bad", "kplr1_lc"],
        Some(vec!["", "LOW_DISP", "", ""]),
    );
    let shuffled = batch(
        vec![Mission::K2, Mission::Kepler, Mission::Kepler, Mission::Iue],
        vec!["ktwo_bad", "kplr1_lc", &obsid, "swp12345"],
        Some(vec!["", "", "", "LOW_DISP"]),
    );
    assert_eq!(forward, shuffled);

    let a = delivery.deliver(&forward).await.unwrap();
    let b = delivery.deliver(&shuffled).await.unwrap();
    assert_eq!(a, b);

    let order: Vec<(String, String)> = parse(&a)
        .iter()
        .map(|s| (s["mission"].to_string(), s["obsid"].to_string()))
        .collect();
    assert_eq!(order.len(), 4);
    assert_eq!(order[0].0, "\"iue\"");
    assert_eq!(order[1].0, "\"k2\"");
}

#[test]
fn test_length_mismatch_rejected() {
    let err = Batch::new(
        vec![Mission::Kepler, Mission::K2],
        vec!["a".to_string()],
        None,
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        DeliveryError::LengthMismatch {
            field: "obsids",
            expected: 2,
            found: 1
        }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unregistered_mission_aborts_batch() {
    let (_tmp, root) = scratch_root();
    let delivery = Delivery::with_registry(config_for(&root), Registry::empty()).unwrap();
    let err = delivery
        .deliver(&batch(vec![Mission::Kepler], vec!["kplr1_lc"], None))
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::UnregisteredMission(Mission::Kepler)));
}

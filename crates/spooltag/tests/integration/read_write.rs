//! Write/read cycles through the facade against a simulated tag.

use std::time::Duration;

use spooltag::ReaderError;
use spooltag_codec::{catalog, Color, SpoolCodec};

use crate::harness::{blank_tag, pla_spec, TestRig, POLL};

#[test]
fn test_write_then_read_pla() {
    let rig = TestRig::new().with_blank_tag();
    rig.reader.write_spool(&pla_spec()).unwrap();

    let spec = rig.reader.read_spool().unwrap();
    assert_eq!(spec.material, "PLA");
    assert_eq!(spec.manufacturer, "AC");
    assert_eq!(spec.range_a.nozzle_min, 200);
    assert_eq!(spec.range_a.nozzle_max, 210);
    assert_eq!((spec.bed_min, spec.bed_max), (50, 60));
    assert_eq!(spec.diameter, 1.75);
    assert_eq!(spec.length, 330);
    assert_eq!(spec.weight, 1000);
    assert!(spec.is_custom());

    let raw = spec.raw.unwrap();
    assert_eq!(raw.sku, "AHPLBK-101");
    assert_eq!(raw.format_version, 2);
}

#[test]
fn test_write_skips_protected_pages() {
    let rig = TestRig::new().with_blank_tag();
    rig.reader.write_spool(&pla_spec()).unwrap();

    let written = rig.sim.written_pages();
    assert_eq!(written.first(), Some(&0x04));
    assert_eq!(written.last(), Some(&0x27));
    assert_eq!(written.len(), 0x24);
    assert!(written.iter().all(|&p| (4..0x28).contains(&p)));

    let tag = rig.sim.tag().unwrap();
    let before = blank_tag();
    for page in (0..4).chain(0x28..0x2d) {
        assert_eq!(tag.page(page), before.page(page), "page {page:#04x} changed");
    }
}

#[test]
fn test_preset_with_speed_tiers_survives_cycle() {
    let rig = TestRig::new().with_blank_tag();
    let preset = catalog::preset("PLA High Speed").unwrap();
    rig.reader.write_spool(&preset).unwrap();

    let spec = rig.reader.read_spool().unwrap();
    assert_eq!(spec.material, "PLA High Speed");
    assert_eq!(spec.range_a, preset.range_a);
    assert_eq!(spec.range_b, preset.range_b);
    assert_eq!(spec.range_c, preset.range_c);
}

#[test]
fn test_color_survives_cycle() {
    let rig = TestRig::new().with_blank_tag();
    let mut spec = pla_spec();
    spec.color = Color::rgb(0x12, 0x80, 0xfe);
    rig.reader.write_spool(&spec).unwrap();

    let tag = rig.sim.tag().unwrap();
    assert_eq!(tag.page(0x14), [0xff, 0xfe, 0x80, 0x12]);
    assert_eq!(rig.reader.read_spool().unwrap().color, spec.color);
}

#[test]
fn test_sku_prefix_resolves_type() {
    let rig = TestRig::new().with_blank_tag();
    rig.reader.write_spool(&pla_spec()).unwrap();

    let mut tag = rig.sim.tag().unwrap();
    tag.write_string(0x05, "AHPLPBK-102");
    rig.sim.present_tag(tag);

    assert_eq!(rig.reader.read_spool().unwrap().material, "PLA+");
}

#[test]
fn test_raw_dump_has_uid_pages_and_interpretation() {
    let rig = TestRig::new().with_blank_tag();
    rig.reader.write_spool(&pla_spec()).unwrap();

    let dump = rig.reader.read_spool_raw().unwrap();
    assert_eq!(dump.uid.as_deref(), Some("04A1B212345678"));
    assert!(dump.text.starts_with("[Page 00] 04:a1:b2:9c\n"));
    assert!(dump.text.contains("[Page 2c] ee:ee:ee:ee"));

    let (pages, interpretation) = dump.text.split_once("\n\n").unwrap();
    assert_eq!(pages.lines().count(), 45);
    let decoded = spooltag_codec::SpoolSpec::from_json(interpretation).unwrap();
    assert_eq!(decoded.material, "PLA");
}

#[test]
fn test_read_failure_returns_no_partial_record() {
    let rig = TestRig::new().with_blank_tag();
    rig.reader.write_spool(&pla_spec()).unwrap();
    rig.sim.fail_read_at(0x10);

    assert!(matches!(
        rig.reader.read_spool(),
        Err(ReaderError::Transport(_))
    ));
    assert!(matches!(
        rig.reader.read_spool_raw(),
        Err(ReaderError::Transport(_))
    ));
    assert_eq!(rig.sim.open_sessions(), 0);
}

#[test]
fn test_write_failure_leaves_earlier_pages_written() {
    let rig = TestRig::new().with_blank_tag();
    rig.sim.fail_write_at(0x10);

    assert!(matches!(
        rig.reader.write_spool(&pla_spec()),
        Err(ReaderError::Transport(_))
    ));
    assert_eq!(rig.sim.written_pages(), (0x04..0x10).collect::<Vec<u8>>());
    let tag = rig.sim.tag().unwrap();
    assert_eq!(tag.read_byte(0x04, 0), 0x7b);
    assert_eq!(tag.read_u16(0x1d, 0), 0);
}

#[test]
fn test_written_tag_matches_encoder_image() {
    let rig = TestRig::new().with_blank_tag();
    let spec = pla_spec();
    rig.reader.write_spool(&spec).unwrap();

    let expected = SpoolCodec::encode(&spec).unwrap();
    let tag = rig.sim.tag().unwrap();
    for page in 4..0x28 {
        assert_eq!(tag.page(page), expected.page(page), "page {page:#04x}");
    }
}

#[test]
fn test_read_waits_for_tag() {
    let rig = TestRig::new();
    let mut tag = blank_tag();
    let image = SpoolCodec::encode(&pla_spec()).unwrap();
    for page in 4..0x28 {
        tag.set_page(page, image.page(page));
    }
    let presenter = rig.present_later(tag, POLL * 5);

    let spec = rig.reader.read_spool().unwrap();
    presenter.join().unwrap();
    assert_eq!(spec.material, "PLA");
    assert!(rig.sim.connect_attempts() > 1);
}

#[test]
fn test_cancel_wait_from_other_thread() {
    let rig = TestRig::new();
    let canceller = {
        let reader = rig.reader.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            reader.cancel_wait_for_tag();
        })
    };

    let result = rig.reader.read_spool();
    canceller.join().unwrap();
    assert!(matches!(result, Err(ReaderError::Cancelled)));

    // A fresh wait is unaffected by the earlier cancel.
    rig.sim.present_tag(blank_tag());
    assert!(rig.reader.read_spool().is_ok());
}

#[test]
fn test_no_reader() {
    let rig = TestRig::with_readers(&[]);
    assert!(!rig.reader.get_connection_state());
    assert!(matches!(rig.reader.read_spool(), Err(ReaderError::NoReader)));
    assert!(matches!(
        rig.reader.write_spool(&pla_spec()),
        Err(ReaderError::NoReader)
    ));
    assert_eq!(rig.sim.connect_attempts(), 0);
}

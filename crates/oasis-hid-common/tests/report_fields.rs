//! Fixed-width field behaviour of the report builder and parser.

use oasis_hid_common::{HidCommonError, ReportBuilder, ReportParser};
use proptest::prelude::*;

proptest! {
    /// A padded field always occupies exactly `width` bytes, whatever the input length.
    #[test]
    fn prop_padded_field_has_fixed_width(
        data in proptest::collection::vec(any::<u8>(), 0..80),
        width in 0usize..64,
    ) {
        let mut builder = ReportBuilder::with_capacity(width);
        builder.write_padded(&data, width);
        prop_assert_eq!(builder.len(), width);

        let kept = data.len().min(width);
        prop_assert_eq!(&builder.as_slice()[..kept], &data[..kept]);
        prop_assert!(builder.as_slice()[kept..].iter().all(|b| *b == 0));
    }

    /// Reading past the end never panics and never moves the cursor.
    #[test]
    fn prop_short_buffer_reads_fail_cleanly(data in proptest::collection::vec(any::<u8>(), 0..4)) {
        let mut parser = ReportParser::new(data.clone());
        prop_assert!(parser.read_u32_be().is_err());
        prop_assert_eq!(parser.remaining(), data.len());
    }
}

#[test]
fn parser_reads_fields_at_documented_offsets() -> Result<(), HidCommonError> {
    // code, len, u32 5000, u8 1, 4-byte name
    let mut parser = ReportParser::from_slice(&[
        0x30, 0x12, 0x00, 0x00, 0x13, 0x88, 0x01, b'O', b'a', 0x00, 0x00,
    ]);
    assert_eq!(parser.read_u8()?, 0x30);
    parser.skip(1);
    assert_eq!(parser.read_u32_be()?, 5000);
    assert_eq!(parser.read_u8()?, 1);
    assert_eq!(parser.read_array::<4>()?, [b'O', b'a', 0, 0]);
    assert_eq!(parser.remaining(), 0);
    Ok(())
}

#[test]
fn parser_skip_saturates_at_end() {
    let mut parser = ReportParser::new(vec![1, 2, 3]);
    parser.skip(100);
    assert_eq!(parser.remaining(), 0);
    parser.reset();
    assert_eq!(parser.remaining(), 3);
}

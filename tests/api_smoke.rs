//! Compile-time smoke test: verify top-level re-exports work.

use mseed_tracelist::{
    AssembleOptions, Assembler, BTime, Blockette, BufferAllocator, ByteOrder, Calibration,
    Channel, ChannelId, DecodeOptions, EncodingFormat, FieldDesc, HPTMODULUS, HpTime, MseedError,
    Record, RecordBuilder, RecordReader, Result, SampleType, Samples, Segment, Selection,
    SelectionList, TimeWindow, TraceList, VecAllocator, assemble, decode_record, encode,
};

#[test]
fn top_level_imports_compile() {
    // Just verify the types are usable from the crate root
    let _: fn(&[u8], &DecodeOptions) -> Result<Record> = decode_record;
    let _: fn(&RecordBuilder) -> Result<Vec<u8>> = encode;
    let _: fn(
        &[u8],
        Option<&dyn Selection>,
        &AssembleOptions,
        VecAllocator,
    ) -> Result<TraceList<Vec<u8>>> = assemble::<VecAllocator>;

    let _bo = ByteOrder::Little;
    let _s = Samples::Float(vec![]);
    let _st = SampleType::Double;
    let _enc = EncodingFormat::Steim2;
    let _bt = BTime {
        year: 2025,
        day: 1,
        hour: 0,
        minute: 0,
        second: 0,
        fract: 0,
    };
    let _t: HpTime = HPTMODULUS;
    let _b = Blockette {
        kind: 1001,
        data: vec![0; 4],
    };
    let _cal = Calibration::Step;
    let _fd = FieldDesc::new(1001, 0, 1);
    let _win = TimeWindow::new(None, Some(0));
    let _sel = SelectionList::new().with_pattern("*");
    let _ch: Channel<Vec<u8>> = Channel::new(ChannelId::default());
    let _seg: Option<Segment<Vec<u8>>> = None;
    let _asm = Assembler::new(&AssembleOptions::default(), VecAllocator);
    let _reader = RecordReader::new(&[]);

    // MseedError is accessible
    let _e: Option<MseedError> = None;
}

#[test]
fn allocator_trait_is_usable() {
    let mut alloc = VecAllocator;
    let buf = alloc.allocate(3, SampleType::Double).unwrap();
    assert_eq!(buf.len(), 24);
}

use super::test_util::*;
use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_remove_emulation_prevention() {
    assert_eq!(
        remove_emulation_prevention(&[0x00, 0x00, 0x03, 0x01]),
        vec![0x00, 0x00, 0x01]
    );
    assert_eq!(
        remove_emulation_prevention(&[0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03, 0x02]),
        vec![0x00, 0x00, 0x01, 0x00, 0x00, 0x02]
    );
    // 00 00 03 00 00 03: the zero run restarts after each escape
    assert_eq!(
        remove_emulation_prevention(&[0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x00]),
        vec![0x00, 0x00, 0x00, 0x00, 0x00]
    );
    let plain = [0x00, 0x01, 0x02, 0x03];
    assert_eq!(remove_emulation_prevention(&plain), plain.to_vec());
}

#[test]
fn test_nal_unit_type() {
    assert_eq!(NalUnitType::of(&[0x65, 0x88]), Some(NalUnitType::IdrSlice));
    assert_eq!(NalUnitType::of(&[0x41]), Some(NalUnitType::NonIdrSlice));
    assert_eq!(NalUnitType::of(&[0x67]), Some(NalUnitType::Sps));
    assert_eq!(NalUnitType::of(&[0x68]), Some(NalUnitType::Pps));
    assert_eq!(NalUnitType::of(&[0x06]), Some(NalUnitType::Sei));
    assert_eq!(NalUnitType::of(&[0x09]), Some(NalUnitType::AccessUnitDelimiter));
    assert_eq!(NalUnitType::of(&[0x14]), Some(NalUnitType::Unspecified(20)));
    assert_eq!(NalUnitType::of(&[]), None);
    assert!(NalUnitType::IdrSlice.is_vcl());
    assert!(!NalUnitType::Sps.is_vcl());

    assert!(idr_present(&[Bytes::from_static(&[0x09, 0xF0]), idr_slice()]));
    assert!(!idr_present(&[non_idr_slice(1, 2)]));
}

#[test]
fn test_parse_sps_baseline() {
    let sps = parse_sps(&sps_nalu(PocConfig::Type0 { log2_lsb_minus4: 2 })).unwrap();
    assert_eq!(sps.profile_idc, 66);
    assert_eq!(sps.level_idc, 31);
    assert_eq!(sps.chroma_format_idc, 1);
    assert_eq!(sps.log2_max_frame_num_minus4, 0);
    assert_eq!(
        sps.pic_order_cnt,
        PicOrderCnt::TypeZero {
            log2_max_pic_order_cnt_lsb_minus4: 2
        }
    );
    assert!(sps.frame_mbs_only_flag);
    assert_eq!((sps.width(), sps.height()), (320, 240));
}

#[test]
fn test_parse_sps_high_profile_with_cropping() {
    // 1920x1080 High profile: 120x68 macroblocks cropped by 8 rows.
    let sps = parse_sps(&high_profile_sps_nalu(0)).unwrap();
    assert_eq!(sps.profile_idc, 100);
    assert_eq!(sps.pic_order_cnt, PicOrderCnt::TypeTwo);
    assert_eq!((sps.width(), sps.height()), (1920, 1080));
    assert!(sps.vui_parameters_present_flag);

    assert!(parse_sps(&high_profile_sps_nalu(127)).is_ok());
    assert!(parse_sps(&high_profile_sps_nalu(-128)).is_ok());
}

#[test]
fn test_parse_sps_rejects_delta_scale_out_of_range() {
    for delta_scale in [128, -129, i32::MAX - 10, i32::MIN + 1] {
        assert!(
            matches!(
                parse_sps(&high_profile_sps_nalu(delta_scale)),
                Err(VdkError::InvalidData(_))
            ),
            "delta_scale {}",
            delta_scale
        );
    }
}

#[test]
fn test_parse_sps_rejects_oversized_picture() {
    let poc = || PocConfig::Type0 { log2_lsb_minus4: 2 };
    let sps = parse_sps(&sps_nalu_with_size(poc(), 62, 2047, 2047)).unwrap();
    assert_eq!((sps.width(), sps.height()), (32768, 32768));

    assert!(matches!(
        parse_sps(&sps_nalu_with_size(poc(), 31, 0x2000_0000, 14)),
        Err(VdkError::InvalidData(_))
    ));
    assert!(matches!(
        parse_sps(&sps_nalu_with_size(poc(), 31, 19, 2048)),
        Err(VdkError::InvalidData(_))
    ));
}

#[test]
fn test_dimensions_saturate() {
    let mut sps = Sps {
        pic_width_in_mbs_minus1: u32::MAX,
        pic_height_in_map_units_minus1: u32::MAX,
        frame_mbs_only_flag: false,
        chroma_format_idc: 1,
        ..Default::default()
    };
    assert_eq!((sps.width(), sps.height()), (u32::MAX, u32::MAX));

    sps.frame_cropping = Some(FrameCropping {
        left: u32::MAX,
        right: u32::MAX,
        top: u32::MAX,
        bottom: u32::MAX,
    });
    assert_eq!((sps.width(), sps.height()), (0, 0));
}

#[test]
fn test_parse_sps_rejects_garbage() {
    assert!(parse_sps(&[]).is_err());
    assert!(parse_sps(&[0x68, 0xCE, 0x3C, 0x80]).is_err());
    // truncated after level_idc
    assert!(parse_sps(&[0x67, 0x42, 0x00]).is_err());
}

#[test]
fn test_parse_sps_type1() {
    let sps = parse_sps(&sps_nalu(PocConfig::Type1)).unwrap();
    assert!(matches!(
        sps.pic_order_cnt,
        PicOrderCnt::TypeOne { ref offsets_for_ref_frame, .. } if offsets_for_ref_frame.len() == 1
    ));
}

#[test]
fn test_parse_slice_headers() {
    let sps = parse_sps(&sps_nalu(PocConfig::Type0 { log2_lsb_minus4: 2 })).unwrap();

    let header = parse_slice_header(&non_idr_slice(3, 42), &sps).unwrap();
    assert_eq!(header.first_mb_in_slice, 0);
    assert_eq!(header.slice_type, 5);
    assert_eq!(header.frame_num, 3);
    assert_eq!(header.pic_order_cnt_lsb, Some(42));

    let header = parse_slice_header(&idr_slice(), &sps).unwrap();
    assert_eq!(header.slice_type, 7);
    assert_eq!(header.pic_order_cnt_lsb, Some(0));

    assert!(parse_slice_header(&[0x67, 0x42], &sps).is_err());
}

#[test]
fn test_codec_maps_errors() {
    let codec = H264Codec::new();
    assert!(matches!(
        codec.decode_sps(&[0x67, 0x42]),
        Err(VdkError::ParameterSet(_))
    ));
    assert!(matches!(codec.pack_annexb(&[]), Err(VdkError::Codec(_))));

    let mut codec = H264Codec::new();
    let sps = parse_sps(&sps_nalu(PocConfig::Type0 { log2_lsb_minus4: 2 })).unwrap();
    assert!(matches!(
        codec.extract_dts(&[non_idr_slice(1, 2)], false, MediaTime::ZERO, &sps),
        Err(VdkError::Codec(_))
    ));
}

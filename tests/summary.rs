//! Sample entry summaries and codec configuration boxes.
mod common;

use isobmff::boxes::*;
use isobmff::io::{MemBuffer, MemReader};
use isobmff::serialize::{FromBytes, ToBytes};
use isobmff::summary::{CodecSpecific, Summary};
use isobmff::types::FourCC;

fn ac3_entry() -> MP4Box {
    let mut entry = Ac3SampleEntry::default();
    entry.channel_count = 6;
    entry.sample_rate_hi = 48000u32 as u16;
    entry.boxes.push(
        AC3SpecificBox {
            fscod:         0,
            bsid:          8,
            bsmod:         0,
            acmod:         7,
            lfeon:         1,
            bit_rate_code: 10,
        }
        .to_mp4box(),
    );
    entry.to_mp4box()
}

#[test]
fn audio_summary_from_ac3_entry() {
    let summary = Summary::from_sample_entry(&ac3_entry()).unwrap();
    let audio = match &summary {
        Summary::Audio(a) => a,
        _ => panic!("expected an audio summary"),
    };
    assert_eq!(audio.codec, FourCC::new("ac-3"));
    assert_eq!(audio.frequency, 48000);
    assert_eq!(audio.channels, 6);
    assert_eq!(audio.extensions.len(), 1);
    assert!(matches!(audio.extensions[0], CodecSpecific::Ac3(_)));

    // The summary builds an equivalent sample entry, which summarizes
    // back to an equal value.
    let rebuilt = summary.to_sample_entry().unwrap();
    let summary2 = Summary::from_sample_entry(&rebuilt).unwrap();
    assert_eq!(summary, summary2);
}

#[test]
fn video_summary_from_avc_entry() {
    let entry = common::avc1_entry();
    let summary = Summary::from_sample_entry(&entry).unwrap();
    let video = match &summary {
        Summary::Video(v) => v,
        _ => panic!("expected a video summary"),
    };
    assert_eq!(video.width, 1280);
    assert_eq!(video.height, 720);
    assert_eq!(video.depth, 24);
    assert!(matches!(video.extensions[0], CodecSpecific::Avc(_)));
}

#[test]
fn structured_to_unstructured() {
    let dac3 = CodecSpecific::Ac3(AC3SpecificBox {
        fscod:         0,
        bsid:          8,
        bsmod:         0,
        acmod:         7,
        lfeon:         1,
        bit_rate_code: 5,
    });
    let unstructured = dac3.to_unstructured().unwrap();
    match &unstructured {
        CodecSpecific::Unstructured { fourcc, data } => {
            assert_eq!(*fourcc, FourCC::new("dac3"));
            assert_eq!(&data.0[..8], &[0, 0, 0, 11, b'd', b'a', b'c', b'3']);
            assert_eq!(&data.0[8..], &[0x10, 0x3c, 0xa0]);
        },
        _ => panic!("expected unstructured"),
    }
}

#[test]
fn dec3_box_roundtrip() {
    let dec3 = EC3SpecificBox {
        data_rate:   640,
        independent: vec![Ec3SubstreamInfo {
            fscod:       0,
            bsid:        16,
            bsmod:       0,
            acmod:       7,
            lfeon:       1,
            num_dep_sub: 1,
            chan_loc:    0x002,
        }],
    };
    let mut buf = MemBuffer::new();
    dec3.to_bytes(&mut buf).unwrap();
    let bytes = buf.into_vec();

    let mut reader = MemReader::new(bytes);
    match MP4Box::from_bytes(&mut reader).unwrap() {
        MP4Box::EC3SpecificBox(parsed) => assert_eq!(parsed, dec3),
        _ => panic!("expected dec3"),
    }
}

#[test]
fn ddts_box_roundtrip() {
    let ddts = DTSSpecificBox {
        dts_sampling_frequency: 48000,
        max_bitrate:            1536000,
        avg_bitrate:            1509000,
        pcm_sample_depth:       24,
        frame_duration:         1,
        stream_construction:    1,
        core_lfe_present:       1,
        core_layout:            9,
        core_size:              511,
        stereo_downmix:         0,
        representation_type:    0,
        channel_layout:         0x000f,
        multi_asset_flag:       0,
        lbr_duration_mod:       0,
        reserved_box:           Default::default(),
    };
    let mut buf = MemBuffer::new();
    ddts.to_bytes(&mut buf).unwrap();
    let bytes = buf.into_vec();
    // 8 byte header + 20 byte payload.
    assert_eq!(bytes.len(), 28);

    let mut reader = MemReader::new(bytes);
    match MP4Box::from_bytes(&mut reader).unwrap() {
        MP4Box::DTSSpecificBox(parsed) => assert_eq!(parsed, ddts),
        _ => panic!("expected ddts"),
    }
}

#[test]
fn esds_descriptor_roundtrip() {
    let payload = isobmff::codecs::mp4a::AudioSpecificConfig::new(
        isobmff::codecs::mp4a::AudioObjectType::AacLc,
        48000,
        2,
        isobmff::codecs::mp4a::SbrMode::NotSpecified,
        &[],
    )
    .unwrap()
    .to_payload();

    let esds = ESDescriptorBox {
        es_descriptor: ESDescriptor {
            es_id:            0,
            stream_priority:  0,
            depends_on_es_id: None,
            url:              None,
            ocr_es_id:        None,
            decoder_config:   DecoderConfigDescriptor {
                object_type:   0x40,
                stream_type:   5,
                upstream:      false,
                buffer_size:   0,
                max_bitrate:   128000,
                avg_bitrate:   128000,
                specific_info: DecoderSpecificInfo {
                    data:  isobmff::types::Data(payload),
                    audio: None,
                },
            },
            sl_config:        SLConfigDescriptor {
                config_type: 2,
                data:        Default::default(),
            },
            data:             Default::default(),
        },
    };
    let mut buf = MemBuffer::new();
    esds.to_bytes(&mut buf).unwrap();
    let bytes = buf.into_vec();

    let mut reader = MemReader::new(bytes);
    match MP4Box::from_bytes(&mut reader).unwrap() {
        MP4Box::ESDescriptorBox(parsed) => {
            let config = &parsed.es_descriptor.decoder_config;
            assert_eq!(config.object_type, 0x40);
            let audio = config.specific_info.audio.as_ref().unwrap();
            assert_eq!(audio.profile, 2);
            assert_eq!(audio.sampling_frequency_index, 3);
            assert_eq!(audio.channel_config, 2);
            assert_eq!(parsed.codec_id(), "mp4a.40.2");
        },
        _ => panic!("expected esds"),
    }
}

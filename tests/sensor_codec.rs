//! Raw sensor bytes to physical units, and APA102 frame packing.
#![cfg(feature = "host")]

mod common;

use common::approx_eq;
use pulse_kit::Error;
use pulse_kit::clock::Tick;
use pulse_kit::sensor_codec::bmp280::{self, Bmp280Calibration};
use pulse_kit::sensor_codec::dht22::{self, DhtReading};
use pulse_kit::sensor_codec::{
    AdcResolution, PhysicalReading, Pixel, PixelBrightness, Unit, decode_adc_10bit,
    decode_adc_12bit, decode_humidity, decode_temperature_celsius, encode_pixel_frame,
    encode_pixel_frame_with, encode_pixels, pixel_frame_len,
};

// ============================================================================
// Humidity / temperature
// ============================================================================

#[test]
fn humidity_spans_the_sensor_range() {
    assert_eq!(decode_humidity(&[0x00, 0x00]), Ok(-6.0));
    let full_scale = decode_humidity(&[0xFF, 0xFF]).expect("two bytes");
    assert!(approx_eq(full_scale, 118.998, 1e-3), "got {full_scale}");
}

#[test]
fn temperature_spans_the_sensor_range() {
    assert_eq!(decode_temperature_celsius(&[0x00, 0x00]), Ok(-46.85));
    let full_scale = decode_temperature_celsius(&[0xFF, 0xFF]).expect("two bytes");
    assert!(approx_eq(full_scale, 128.87, 1e-2), "got {full_scale}");
}

#[test]
fn humidity_midscale_word_is_big_endian() {
    // 0x8000 is exactly half scale.
    let half = decode_humidity(&[0x80, 0x00]).expect("two bytes");
    assert!(approx_eq(half, 56.5, 1e-4), "got {half}");
}

#[test]
fn wrong_sample_lengths_are_rejected() {
    assert_eq!(
        decode_humidity(&[0x12]),
        Err(Error::InvalidInput {
            expected: 2,
            actual: 1
        })
    );
    assert_eq!(
        decode_temperature_celsius(&[0x12, 0x34, 0x56]),
        Err(Error::InvalidInput {
            expected: 2,
            actual: 3
        })
    );
    assert_eq!(
        decode_adc_12bit(&[0x00, 0x0F]),
        Err(Error::InvalidInput {
            expected: 3,
            actual: 2
        })
    );
    assert!(decode_adc_10bit(&[]).is_err());
}

#[test]
fn readings_carry_their_unit() {
    let humidity = PhysicalReading::humidity(&[0x00, 0x00]).expect("two bytes");
    assert_eq!(humidity.unit, Unit::RelativeHumidityPercent);
    assert_eq!(humidity.value, -6.0);

    let temperature = PhysicalReading::temperature(&[0x00, 0x00]).expect("two bytes");
    assert_eq!(temperature.unit, Unit::Celsius);

    let count = PhysicalReading::adc_count(1_023);
    assert_eq!(count.unit, Unit::AdcCount);
    assert_eq!(count.value, 1_023.0);

    let altitude = PhysicalReading::meters(56.1);
    assert_eq!(altitude.unit, Unit::Meter);
}

// ============================================================================
// SPI ADC
// ============================================================================

#[test]
fn adc_words_mask_the_unused_high_bits() {
    assert_eq!(decode_adc_10bit(&[0xFF, 0xFF, 0xFF]), Ok(0x03FF));
    assert_eq!(decode_adc_10bit(&[0x00, 0x02, 0x10]), Ok(0x0210));
    assert_eq!(decode_adc_12bit(&[0xFF, 0xFF, 0xFF]), Ok(0x0FFF));
    assert_eq!(decode_adc_12bit(&[0x00, 0x08, 0x00]), Ok(0x0800));
}

#[test]
fn adc_resolution_selects_the_decoder() {
    let raw = [0x00, 0x0E, 0x01];
    assert_eq!(AdcResolution::Bits10.decode(&raw), Ok(0x0201));
    assert_eq!(AdcResolution::Bits12.decode(&raw), Ok(0x0E01));
    assert_eq!(AdcResolution::Bits10.max_count(), 1_023);
    assert_eq!(AdcResolution::Bits12.max_count(), 4_095);
}

#[test]
fn adc_counts_scale_against_the_reference() {
    let volts = AdcResolution::Bits12.to_volts(2_048, 3.3);
    assert!(approx_eq(volts, 1.65, 1e-5), "got {volts}");

    let zero = AdcResolution::Bits10.to_volts(0, 3.3);
    assert_eq!(zero, 0.0);

    let full = AdcResolution::Bits10.to_volts(1_023, 3.3);
    assert!(full < 3.3);
    assert!(approx_eq(full, 3.3 * 1_023.0 / 1_024.0, 1e-5));
}

// ============================================================================
// BMP280
// ============================================================================

// Calibration example from the Bosch datasheet.
fn datasheet_calibration_bytes() -> Vec<u8> {
    let unsigned = [27_504_u16];
    let t = [26_435_i16, -1_000];
    let p1 = [36_477_u16];
    let p = [-10_685_i16, 3_024, 2_855, 140, -7, 15_500, -14_600, 6_000];

    let mut bytes = Vec::new();
    bytes.extend(unsigned.iter().flat_map(|word| word.to_le_bytes()));
    bytes.extend(t.iter().flat_map(|word| word.to_le_bytes()));
    bytes.extend(p1.iter().flat_map(|word| word.to_le_bytes()));
    bytes.extend(p.iter().flat_map(|word| word.to_le_bytes()));
    bytes
}

#[test]
fn calibration_table_is_little_endian() {
    let calibration =
        Bmp280Calibration::from_le_bytes(&datasheet_calibration_bytes()).expect("24 bytes");

    assert_eq!(calibration.dig_t1, 27_504);
    assert_eq!(calibration.dig_t3, -1_000);
    assert_eq!(calibration.dig_p1, 36_477);
    assert_eq!(calibration.dig_p6, -7);
    assert_eq!(calibration.dig_p9, 6_000);
}

#[test]
fn short_calibration_table_is_rejected() {
    assert_eq!(
        Bmp280Calibration::from_le_bytes(&[0; 23]),
        Err(Error::InvalidInput {
            expected: 24,
            actual: 23
        })
    );
}

#[test]
fn datasheet_example_compensates_to_25_degrees_and_1006_hpa() {
    let calibration =
        Bmp280Calibration::from_le_bytes(&datasheet_calibration_bytes()).expect("24 bytes");
    let adc_t = bmp280::raw_20bit(&[0x7E, 0xED, 0x00]).expect("three bytes");
    let adc_p = bmp280::raw_20bit(&[0x65, 0x5A, 0xC0]).expect("three bytes");
    assert_eq!(adc_t, 519_888);
    assert_eq!(adc_p, 415_148);

    let temperature = calibration.compensate_temperature(adc_t);
    assert!(approx_eq(temperature.celsius, 25.08, 0.01), "got {}", temperature.celsius);
    assert_eq!(temperature.t_fine, 128_422);

    let pressure = calibration.compensate_pressure(adc_p, temperature.t_fine);
    assert!(approx_eq(pressure, 100_653.27, 1.5), "got {pressure}");
}

#[test]
fn zero_pressure_divisor_yields_zero() {
    let mut bytes = datasheet_calibration_bytes();
    // dig_P1 lives at offset 6.
    bytes[6] = 0;
    bytes[7] = 0;
    let calibration = Bmp280Calibration::from_le_bytes(&bytes).expect("24 bytes");

    assert_eq!(calibration.compensate_pressure(415_148, 128_422), 0.0);
}

#[test]
fn corrupted_calibration_gives_a_value_instead_of_panicking() {
    let calibration = Bmp280Calibration::from_le_bytes(&[0x7F; 24]).expect("24 bytes");

    let temperature = calibration.compensate_temperature(0xF_FFFF);
    let pressure = calibration.compensate_pressure(0, temperature.t_fine);
    assert!(pressure.is_finite(), "got {pressure}");

    let extreme = calibration.compensate_pressure(i32::MIN, i32::MAX);
    assert!(extreme.is_finite(), "got {extreme}");
}

#[test]
fn altitude_follows_the_barometric_formula() {
    let sea_level = bmp280::altitude_meters(101_325.0, bmp280::STANDARD_SEA_LEVEL_HPA);
    assert!(approx_eq(sea_level, 0.0, 0.01), "got {sea_level}");

    let one_km = bmp280::altitude_meters(89_876.46, bmp280::STANDARD_SEA_LEVEL_HPA);
    assert!(approx_eq(one_km, 1_000.0, 0.5), "got {one_km}");

    // A lower reference pressure puts the same reading closer to sea level.
    let local = bmp280::altitude_meters(100_000.0, 1_000.0);
    assert!(approx_eq(local, 0.0, 0.01), "got {local}");
    let below = bmp280::altitude_meters(101_000.0, 1_000.0);
    assert!(below < 0.0, "got {below}");
}

// ============================================================================
// DHT22
// ============================================================================

// 65.2 %RH, 35.1 °C, from the AM2302 datasheet.
const DATASHEET_FRAME: u64 = 0x02_8C_01_5F_EE;

/// Falling edges at 1 MHz for `bits`: 76 us gaps for 0, 120 us for 1.
fn edges_for(bits: u64) -> Vec<Tick> {
    let mut at = 5_000;
    let mut edges = vec![Tick(at)];
    for index in (0..dht22::DATA_BITS).rev() {
        at += if (bits >> index) & 1 == 1 { 120 } else { 76 };
        edges.push(Tick(at));
    }
    edges
}

#[test]
fn dht_edge_gaps_classify_msb_first() {
    let edges = edges_for(DATASHEET_FRAME);
    assert_eq!(edges.len(), dht22::EDGE_COUNT);

    assert_eq!(dht22::classify_bits(&edges, 1_000_000), Ok(DATASHEET_FRAME));
}

#[test]
fn dht_classification_follows_the_clock_frequency() {
    // Same waveform sampled by a 1 GHz clock.
    let edges: Vec<Tick> = edges_for(DATASHEET_FRAME)
        .into_iter()
        .map(|Tick(at)| Tick(at * 1_000))
        .collect();

    assert_eq!(dht22::classify_bits(&edges, 1_000_000_000), Ok(DATASHEET_FRAME));
}

#[test]
fn dht_needs_exactly_41_edges() {
    let edges = edges_for(DATASHEET_FRAME);

    assert_eq!(
        dht22::classify_bits(&edges[1..], 1_000_000),
        Err(Error::InvalidInput {
            expected: 41,
            actual: 40
        })
    );
}

#[test]
fn dht_frame_decodes_tenths() {
    let reading = DhtReading::from_bits(DATASHEET_FRAME).expect("checksum matches");

    assert!(approx_eq(reading.humidity_percent(), 65.2, 1e-4));
    assert!(approx_eq(reading.temperature_celsius(), 35.1, 1e-4));
    assert_eq!(reading.humidity().unit, Unit::RelativeHumidityPercent);
    assert_eq!(reading.temperature().unit, Unit::Celsius);
}

#[test]
fn dht_temperature_top_bit_is_the_sign() {
    let reading =
        DhtReading::from_bytes(&[0x02, 0x8C, 0x80, 0x65, 0x73]).expect("checksum matches");

    assert!(approx_eq(reading.temperature_celsius(), -10.1, 1e-4));
    assert!(approx_eq(reading.humidity_percent(), 65.2, 1e-4));
}

#[test]
fn dht_checksum_mismatch_is_invalid_input() {
    assert_eq!(
        DhtReading::from_bits(DATASHEET_FRAME + 1),
        Err(Error::InvalidInput {
            expected: 0xEE,
            actual: 0xEF
        })
    );
    assert!(DhtReading::from_bytes(&[0x02, 0x8C, 0x01, 0x5F]).is_err());
}

// ============================================================================
// APA102
// ============================================================================

#[test]
fn empty_frame_is_start_and_one_end_byte() {
    let frame = encode_pixel_frame::<8>(&[]).expect("fits");
    assert_eq!(frame.as_slice(), &[0, 0, 0, 0, 0]);
}

#[test]
fn pixel_record_is_brightness_then_halved_bgr() {
    let frame = encode_pixel_frame::<16>(&[Pixel::new(255, 128, 0)]).expect("fits");
    assert_eq!(frame.as_slice(), &[0, 0, 0, 0, 0xFF, 0, 64, 127, 0]);
}

#[test]
fn frame_length_follows_pixel_count() {
    let pixels = [Pixel::new(2, 4, 6); 3];
    let frame = encode_pixel_frame::<32>(&pixels).expect("fits");

    assert_eq!(frame.len(), pixel_frame_len(3));
    assert_eq!(frame.len(), 4 + 12 + 2);
    assert_eq!(&frame[4..8], &[0xFF, 3, 2, 1]);
    assert!(frame[16..].iter().all(|&byte| byte == 0));
}

#[test]
fn global_brightness_replaces_the_header_byte() {
    let frame =
        encode_pixel_frame_with::<16>(&[Pixel::new(10, 20, 30)], PixelBrightness::Global(7))
            .expect("fits");
    assert_eq!(&frame[4..8], &[0xE7, 15, 10, 5]);
}

#[test]
fn undersized_buffer_reports_what_was_needed() {
    assert_eq!(
        encode_pixel_frame::<8>(&[Pixel::new(1, 1, 1)]),
        Err(Error::BufferTooSmall {
            needed: 9,
            capacity: 8
        })
    );
    assert_eq!(
        encode_pixel_frame::<4>(&[]),
        Err(Error::BufferTooSmall {
            needed: 5,
            capacity: 4
        })
    );
}

#[test]
fn any_pixel_iterator_can_be_encoded() {
    let ramp = (0..4_u8).map(|step| Pixel::new(step * 64, 0, 0));
    let frame = encode_pixels::<32, _>(ramp, PixelBrightness::Full).expect("fits");

    let reds: Vec<u8> = frame[4..20].chunks_exact(4).map(|record| record[3]).collect();
    assert_eq!(reds, vec![0, 32, 64, 96]);
}

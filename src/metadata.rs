// 📷 Image Metadata Decoder - camera + GPS attributes from raw image bytes
//
// Consumed through the `MetadataDecoder` trait so the HTTP layer does not
// depend on the tag-decoding library. `ExifDecoder` is the kamadak-exif backed
// implementation: JPEG, TIFF, HEIF, PNG and WebP containers are understood.

use crate::error::{CensusError, Result};
use exif::{Field, In, Rational, Reader, SRational, Tag, Value};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

// ============================================================================
// DECODED METADATA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPosition {
    pub lat: f64,
    pub lng: f64,
}

/// Flat set of camera attributes; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(rename = "cameraMake")]
    pub camera_make: Option<String>,

    #[serde(rename = "cameraModel")]
    pub camera_model: Option<String>,

    #[serde(rename = "focalLength_mm")]
    pub focal_length_mm: Option<f64>,

    #[serde(rename = "aperture_fNumber")]
    pub aperture_f_number: Option<f64>,

    pub iso: Option<u32>,

    /// Kept as a fraction ("1/125") for display
    #[serde(rename = "exposureTime")]
    pub exposure_time: Option<String>,

    #[serde(rename = "exposureComp_ev")]
    pub exposure_comp_ev: Option<f64>,

    pub orientation: Option<u32>,

    #[serde(rename = "datetimeOriginal")]
    pub datetime_original: Option<String>,

    pub gps: Option<GpsPosition>,
}

impl ImageMetadata {
    /// Build from decoded EXIF fields. Only primary-image fields are considered.
    pub fn from_fields<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = &'a Field>,
    {
        let primary: Vec<&Field> = fields
            .into_iter()
            .filter(|f| f.ifd_num == In::PRIMARY)
            .collect();
        let get = |tag: Tag| primary.iter().copied().find(|f| f.tag == tag);

        let lat = gps_to_decimal(get(Tag::GPSLatitude), get(Tag::GPSLatitudeRef));
        let lng = gps_to_decimal(get(Tag::GPSLongitude), get(Tag::GPSLongitudeRef));

        ImageMetadata {
            camera_make: get(Tag::Make).and_then(ascii_value),
            camera_model: get(Tag::Model).and_then(ascii_value),
            focal_length_mm: get(Tag::FocalLength).and_then(rational_value),
            aperture_f_number: get(Tag::FNumber).and_then(rational_value),
            iso: get(Tag::PhotographicSensitivity).and_then(|f| f.value.get_uint(0)),
            exposure_time: get(Tag::ExposureTime).and_then(fraction_value),
            exposure_comp_ev: get(Tag::ExposureBiasValue).and_then(rational_value),
            orientation: get(Tag::Orientation).and_then(|f| f.value.get_uint(0)),
            datetime_original: get(Tag::DateTimeOriginal).and_then(ascii_value),
            gps: match (lat, lng) {
                (Some(lat), Some(lng)) => Some(GpsPosition { lat, lng }),
                _ => None,
            },
        }
    }
}

// ============================================================================
// DECODER
// ============================================================================

pub trait MetadataDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<ImageMetadata>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExifDecoder;

impl MetadataDecoder for ExifDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<ImageMetadata> {
        let exif = Reader::new()
            .read_from_container(&mut Cursor::new(bytes))
            .map_err(|e| CensusError::Decode(e.to_string()))?;

        Ok(ImageMetadata::from_fields(exif.fields()))
    }
}

// ============================================================================
// VALUE CONVERSION
// ============================================================================

fn ascii_value(field: &Field) -> Option<String> {
    match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string()),
        _ => None,
    }
}

fn rational_to_f64(r: &Rational) -> Option<f64> {
    if r.denom == 0 {
        None
    } else {
        Some(f64::from(r.num) / f64::from(r.denom))
    }
}

fn srational_to_f64(r: &SRational) -> Option<f64> {
    if r.denom == 0 {
        None
    } else {
        Some(f64::from(r.num) / f64::from(r.denom))
    }
}

fn rational_value(field: &Field) -> Option<f64> {
    match &field.value {
        Value::Rational(values) => values.first().and_then(rational_to_f64),
        Value::SRational(values) => values.first().and_then(srational_to_f64),
        _ => None,
    }
}

fn fraction_value(field: &Field) -> Option<String> {
    match &field.value {
        Value::Rational(values) => values
            .first()
            .filter(|r| r.denom != 0)
            .map(|r| format!("{}/{}", r.num, r.denom)),
        _ => None,
    }
}

/// Degrees/minutes/seconds → signed decimal degrees (S and W are negative)
fn gps_to_decimal(coord: Option<&Field>, reference: Option<&Field>) -> Option<f64> {
    let parts = match &coord?.value {
        Value::Rational(values) if values.len() >= 3 => values,
        _ => return None,
    };
    let reference = ascii_value(reference?)?;

    let component = |r: &Rational| rational_to_f64(r).unwrap_or(0.0);
    let decimal = component(&parts[0]) + component(&parts[1]) / 60.0 + component(&parts[2]) / 3600.0;

    match reference.as_str() {
        "S" | "W" => Some(-decimal),
        _ => Some(decimal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(tag: Tag, value: Value) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value,
        }
    }

    fn ascii(s: &str) -> Value {
        Value::Ascii(vec![s.as_bytes().to_vec()])
    }

    fn rational(num: u32, denom: u32) -> Rational {
        Rational { num, denom }
    }

    fn sample_fields() -> Vec<Field> {
        vec![
            field(Tag::Make, ascii("Canon")),
            field(Tag::Model, ascii("EOS 80D")),
            field(Tag::FocalLength, Value::Rational(vec![rational(50, 1)])),
            field(Tag::FNumber, Value::Rational(vec![rational(18, 10)])),
            field(Tag::PhotographicSensitivity, Value::Short(vec![400])),
            field(Tag::ExposureTime, Value::Rational(vec![rational(1, 125)])),
            field(Tag::ExposureBiasValue, Value::SRational(vec![SRational { num: -2, denom: 3 }])),
            field(Tag::Orientation, Value::Short(vec![1])),
            field(Tag::DateTimeOriginal, ascii("2024:05:01 10:30:00")),
            field(
                Tag::GPSLatitude,
                Value::Rational(vec![rational(19, 1), rational(2, 1), rational(36, 1)]),
            ),
            field(Tag::GPSLatitudeRef, ascii("N")),
            field(
                Tag::GPSLongitude,
                Value::Rational(vec![rational(98, 1), rational(12, 1), rational(0, 1)]),
            ),
            field(Tag::GPSLongitudeRef, ascii("W")),
        ]
    }

    #[test]
    fn test_metadata_from_fields() {
        let fields = sample_fields();
        let meta = ImageMetadata::from_fields(&fields);

        assert_eq!(meta.camera_make.as_deref(), Some("Canon"));
        assert_eq!(meta.camera_model.as_deref(), Some("EOS 80D"));
        assert_eq!(meta.focal_length_mm, Some(50.0));
        assert_eq!(meta.aperture_f_number, Some(1.8));
        assert_eq!(meta.iso, Some(400));
        assert_eq!(meta.exposure_time.as_deref(), Some("1/125"));
        assert!((meta.exposure_comp_ev.unwrap() + 0.6667).abs() < 0.001);
        assert_eq!(meta.orientation, Some(1));
        assert_eq!(meta.datetime_original.as_deref(), Some("2024:05:01 10:30:00"));

        let gps = meta.gps.unwrap();
        assert!((gps.lat - 19.043333).abs() < 1e-5);
        assert!((gps.lng + 98.2).abs() < 1e-9);
    }

    #[test]
    fn test_gps_requires_both_coordinates() {
        let fields: Vec<Field> = sample_fields()
            .into_iter()
            .filter(|f| f.tag != Tag::GPSLongitudeRef)
            .collect();

        assert!(ImageMetadata::from_fields(&fields).gps.is_none());
    }

    #[test]
    fn test_zero_denominator_is_absent() {
        let fields = vec![
            field(Tag::FNumber, Value::Rational(vec![rational(18, 0)])),
            field(Tag::ExposureTime, Value::Rational(vec![rational(1, 0)])),
        ];
        let meta = ImageMetadata::from_fields(&fields);

        assert!(meta.aperture_f_number.is_none());
        assert!(meta.exposure_time.is_none());
    }

    #[test]
    fn test_thumbnail_fields_ignored() {
        let fields = vec![Field {
            tag: Tag::Make,
            ifd_num: In::THUMBNAIL,
            value: ascii("Thumbnail Corp"),
        }];

        assert_eq!(ImageMetadata::from_fields(&fields), ImageMetadata::default());
    }

    #[test]
    fn test_serialized_field_names() {
        let meta = ImageMetadata::from_fields(&sample_fields());
        let json = serde_json::to_value(&meta).unwrap();

        assert_eq!(json["cameraMake"], "Canon");
        assert_eq!(json["focalLength_mm"], 50.0);
        assert_eq!(json["aperture_fNumber"], 1.8);
        assert_eq!(json["exposureTime"], "1/125");
        assert!(json["gps"]["lat"].is_number());
    }

    #[test]
    fn test_decode_minimal_tiff() {
        // Little-endian TIFF with a single IFD0 entry: Make = "Canon"
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"II");
        bytes.extend_from_slice(&42u16.to_le_bytes());
        bytes.extend_from_slice(&8u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&0x010fu16.to_le_bytes()); // Make
        bytes.extend_from_slice(&2u16.to_le_bytes()); // ASCII
        bytes.extend_from_slice(&6u32.to_le_bytes());
        bytes.extend_from_slice(&26u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // no next IFD
        bytes.extend_from_slice(b"Canon\0");

        let meta = ExifDecoder.decode(&bytes).unwrap();
        assert_eq!(meta.camera_make.as_deref(), Some("Canon"));
        assert!(meta.gps.is_none());
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = ExifDecoder.decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, CensusError::Decode(_)));
    }
}

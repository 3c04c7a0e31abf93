use cgmath::{InnerSpace, Point2};
use thiserror::Error;


pub const EQUATORIAL_CIRCUMFERENCE: f64 = 24901.0; // miles
pub const POLAR_CIRCUMFERENCE: f64 = 24860.0; // miles
pub const ONE_MILE_LATITUDE_DEGREES: f64 = 360.0 / EQUATORIAL_CIRCUMFERENCE;
pub const ONE_MILE_LONGITUDE_DEGREES: f64 = 360.0 / POLAR_CIRCUMFERENCE;


#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("{field} must be a number, got '{value}'")]
    NotANumber { field: &'static str, value: String },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange { field: &'static str, value: f64, min: f64, max: f64 },

    #[error("radius must be greater than 0, got {0}")]
    NonPositiveRadius(f64),

    #[error("{field} must be a boolean, got '{value}'")]
    NotABoolean { field: &'static str, value: String },
}


/// Parses a finite float from user input. `NaN` and infinities are rejected.
pub fn parse_number(field: &'static str, value: &str) -> Result<f64, InputError> {
    value.trim().parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InputError::NotANumber { field, value: value.to_owned() })
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64, InputError> {
    if value >= min && value <= max {
        Ok(value)
    }
    else {
        Err(InputError::OutOfRange { field, value, min, max })
    }
}

pub fn parse_latitude(value: &str) -> Result<f64, InputError> {
    check_range("latitude", parse_number("latitude", value)?, -90.0, 90.0)
}

pub fn parse_longitude(value: &str) -> Result<f64, InputError> {
    check_range("longitude", parse_number("longitude", value)?, -180.0, 180.0)
}


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InputError> {
        Ok(Coordinate {
            latitude: check_range("latitude", latitude, -90.0, 90.0)?,
            longitude: check_range("longitude", longitude, -180.0, 180.0)?,
        })
    }

    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, InputError> {
        Coordinate::new(
            parse_number("latitude", latitude)?,
            parse_number("longitude", longitude)?)
    }

    fn as_point(&self) -> Point2<f64> {
        Point2::new(self.longitude, self.latitude)
    }

    /// Planar distance in degrees, treating longitude and latitude as x and y.
    pub fn planar_distance(&self, other: &Coordinate) -> f64 {
        (self.as_point() - other.as_point()).magnitude()
    }
}


/// Search radius in miles. Always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Radius(f64);

impl Radius {
    pub const DEFAULT: Radius = Radius(5.0);

    pub fn new(miles: f64) -> Result<Self, InputError> {
        if !miles.is_finite() {
            Err(InputError::NotANumber { field: "radius", value: miles.to_string() })
        }
        else if miles <= 0.0 {
            Err(InputError::NonPositiveRadius(miles))
        }
        else {
            Ok(Radius(miles))
        }
    }

    pub fn parse(value: &str) -> Result<Self, InputError> {
        Radius::new(parse_number("radius", value)?)
    }

    pub fn miles(&self) -> f64 {
        self.0
    }
}


/// Axis-aligned box approximating a circle of `radius` miles around a point.
///
/// Degrees per mile are constant, so the box gets too narrow towards the
/// poles and does not wrap around the anti-meridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn around(center: Coordinate, radius: Radius) -> Self {
        let lat_span = ONE_MILE_LATITUDE_DEGREES * radius.miles();
        let lon_span = ONE_MILE_LONGITUDE_DEGREES * radius.miles();

        BoundingBox {
            north: center.latitude + lat_span,
            south: center.latitude - lat_span,
            east: center.longitude + lon_span,
            west: center.longitude - lon_span,
        }
    }
}


pub fn parse_flag(field: &'static str, value: &str) -> Result<bool, InputError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(InputError::NotABoolean { field, value: value.to_owned() }),
    }
}

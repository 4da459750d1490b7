//! RGB colours and their packed `0xRRGGBB` form

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    /// Channels above 8 bits are ignored.
    pub fn from_packed(value: u32) -> Rgb {
        let channel = |shift: u32| f64::from((value >> shift) & 0xFF) / 255.0;
        Rgb {
            r: channel(16),
            g: channel(8),
            b: channel(0),
        }
    }

    pub fn to_packed(&self) -> u32 {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    pub fn gray(level: f64) -> Rgb {
        Rgb {
            r: level,
            g: level,
            b: level,
        }
    }

    /// Naive CMYK conversion, without a colour profile.
    pub fn from_cmyk(c: f64, m: f64, y: f64, k: f64) -> Rgb {
        Rgb {
            r: (1.0 - c) * (1.0 - k),
            g: (1.0 - m) * (1.0 - k),
            b: (1.0 - y) * (1.0 - k),
        }
    }

    /// Interpret 1, 3 or 4 colour components as gray, RGB or CMYK.
    pub fn from_components(components: &[f64]) -> Option<Rgb> {
        match *components {
            [level] => Some(Rgb::gray(level)),
            [r, g, b] => Some(Rgb { r, g, b }),
            [c, m, y, k] => Some(Rgb::from_cmyk(c, m, y, k)),
            _ => None,
        }
    }
}

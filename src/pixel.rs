#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash, PartialOrd, Ord)]
pub struct Pixel {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}
impl Pixel {
    pub const TRANSPARENT: Pixel = Pixel::new(0, 0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, u8::MAX)
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    pub fn is_grey(&self) -> bool {
        self.red == self.green && self.green == self.blue
    }

    /// Composites `self` over `dst` with integer arithmetic.
    pub fn over(self, dst: Pixel) -> Pixel {
        match (self.alpha, dst.alpha) {
            (u8::MAX, _) => self,
            (0, _) => dst,
            (_, 0) => self,
            (sa, da) => {
                let u = sa as u32 * 255;
                let v = (255 - sa as u32) * da as u32;
                let al = u + v;
                let mix = |sc: u8, dc: u8| ((sc as u32 * u + dc as u32 * v) / al) as u8;
                Pixel::new(
                    mix(self.red, dst.red),
                    mix(self.green, dst.green),
                    mix(self.blue, dst.blue),
                    (al / 255) as u8,
                )
            }
        }
    }
}

/// Blends a row of RGBA source pixels over a row of RGBA destination pixels.
pub(crate) fn blend_row_over(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let blended = Pixel::from_slice(s).over(Pixel::from_slice(d));
        d.copy_from_slice(&blended.to_bytes());
    }
}

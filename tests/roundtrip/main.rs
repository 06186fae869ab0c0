use miniz_oxide::deflate::compress_to_vec_zlib;
use simple_apng::{
    chunks::{iter_chunks, Chunk},
    decoder::parse_signature,
    optimize,
    writer::ChunkWriter,
    AnimationSequence, BlendOp, Delay, DisposeOp, FrameControl, Options, Pixel, Rect, Target,
    APNG,
};

struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}
impl Canvas {
    fn new(width: u32, height: u32, fill: impl Fn(u32, u32) -> Pixel) -> Self {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| fill(x, y))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    fn with(mut self, x: u32, y: u32, size: u32, pixel: Pixel) -> Self {
        for j in y..y + size {
            for i in x..x + size {
                self.pixels[(j * self.width + i) as usize] = pixel;
            }
        }
        self
    }

    fn zlib(&self) -> Vec<u8> {
        let mut raw = vec![];
        for row in self.pixels.chunks(self.width as usize) {
            raw.push(0);
            raw.extend(row.iter().flat_map(|p| p.to_bytes()));
        }
        compress_to_vec_zlib(&raw, 6)
    }
}

/// Writes every frame as a full-canvas replacement, the way a naive
/// exporter would.
fn build(
    frames: &[(Canvas, Delay)],
    default_image: Option<&Canvas>,
    extra_chunks: &[(&[u8; 4], &[u8])],
) -> Vec<u8> {
    let (width, height) = (frames[0].0.width, frames[0].0.height);
    let mut png = ChunkWriter::new();
    let mut header = width.to_be_bytes().to_vec();
    header.extend(height.to_be_bytes());
    header.extend([8, 6, 0, 0, 0]);
    png.write_chunk(b"IHDR", &header);
    if frames.len() > 1 || default_image.is_some() {
        let mut actl = (frames.len() as u32).to_be_bytes().to_vec();
        actl.extend(0u32.to_be_bytes());
        png.write_chunk(b"acTL", &actl);
    }
    for (chunk_type, data) in extra_chunks {
        png.write_chunk(chunk_type, data);
    }
    if let Some(image) = default_image {
        png.write_image_data(&image.zlib(), true);
    }
    for (i, (canvas, delay)) in frames.iter().enumerate() {
        if frames.len() > 1 || default_image.is_some() {
            png.write_frame_control(&FrameControl {
                rect: Rect::canvas(width, height),
                delay: *delay,
                dispose_op: DisposeOp::None,
                blend_op: BlendOp::Source,
            });
        }
        png.write_image_data(&canvas.zlib(), i == 0 && default_image.is_none());
    }
    png.finish()
}

/// Displayed frames as RGBA with invisible color zeroed and consecutive
/// repeats folded together.
fn timeline(sequence: &AnimationSequence) -> Vec<(Vec<u8>, Delay)> {
    let frames = sequence.to_rgba_frames().unwrap();
    let mut out: Vec<(Vec<u8>, Delay)> = vec![];
    for frame in &frames[sequence.first_displayed()..] {
        let mut pixels = frame.as_bytes().to_vec();
        for pixel in pixels.chunks_exact_mut(4) {
            if pixel[3] == 0 {
                pixel.fill(0);
            }
        }
        match out.last_mut() {
            Some((last, delay)) if *last == pixels => *delay = delay.merge(frame.delay),
            _ => out.push((pixels, frame.delay)),
        }
    }
    out
}

fn assert_same_animation(before: &[u8], after: &[u8]) {
    let before = APNG::decode(before, &Options::default()).unwrap();
    let after = APNG::decode(after, &Options::default()).unwrap();
    assert_eq!(
        before.sequence().first_frame_is_default_image(),
        after.sequence().first_frame_is_default_image()
    );
    let (expected, actual) = (timeline(before.sequence()), timeline(after.sequence()));
    assert_eq!(expected.len(), actual.len());
    for (i, ((want, want_delay), (got, got_delay))) in expected.iter().zip(&actual).enumerate() {
        assert!(want == got, "frame {i} differs");
        assert!(
            want_delay.same_duration(got_delay),
            "frame {i}: {want_delay:?} vs {got_delay:?}"
        );
    }
}

fn chunk_names(png: &[u8]) -> Vec<String> {
    let (rest, _) = parse_signature(png).unwrap();
    iter_chunks(rest)
        .map(|chunk| match chunk.unwrap() {
            Chunk::IHDR(_) => "IHDR".to_string(),
            Chunk::PLTE(_) => "PLTE".to_string(),
            Chunk::tRNS(_) => "tRNS".to_string(),
            Chunk::acTL(_) => "acTL".to_string(),
            Chunk::fcTL(_) => "fcTL".to_string(),
            Chunk::IDAT(_) => "IDAT".to_string(),
            Chunk::fdAT(_) => "fdAT".to_string(),
            Chunk::IEND => "IEND".to_string(),
            Chunk::Unknown(raw) => raw.name().into_owned(),
        })
        .collect()
}

fn targets() -> [Options; 2] {
    [
        Options::for_target(Target::Apng),
        Options::for_target(Target::WebP),
    ]
}

const RED: Pixel = Pixel::opaque(220, 20, 20);
const CLEAR: Pixel = Pixel::TRANSPARENT;

fn sprite_frames() -> Vec<(Canvas, Delay)> {
    let blank = || Canvas::new(8, 8, |_, _| CLEAR);
    vec![
        (blank().with(1, 1, 2, RED), Delay::new(1, 10)),
        (blank().with(3, 2, 2, RED), Delay::new(1, 10)),
        (blank().with(3, 2, 2, RED), Delay::new(2, 10)),
        (
            blank()
                .with(3, 2, 2, RED)
                .with(6, 6, 1, Pixel::new(0, 0, 255, 100)),
            Delay::new(1, 20),
        ),
        (blank(), Delay::new(0, 0)),
        (blank().with(1, 1, 2, RED), Delay::new(1, 10)),
    ]
}

fn gradient(x: u32, y: u32) -> Pixel {
    Pixel::opaque((x * 12) as u8, (y * 12) as u8, (x + y) as u8)
}

#[test]
fn palette_animation_survives_optimization() {
    let input = build(&sprite_frames(), None, &[]);
    for options in targets() {
        let output = optimize(&input, &options).unwrap();
        assert_same_animation(&input, &output);
        assert!(chunk_names(&output).contains(&"PLTE".to_string()));
    }
}

#[test]
fn duplicates_are_merged_in_the_output() {
    let input = build(&sprite_frames(), None, &[]);
    let output = optimize(&input, &Options::default()).unwrap();
    let apng = APNG::decode(&output, &Options::default()).unwrap();
    let delays: Vec<_> = apng
        .sequence()
        .displayed_frames()
        .iter()
        .map(|f| f.delay)
        .collect();
    assert_eq!(delays.len(), 5);
    assert_eq!(delays[1], Delay::new(3, 10));
}

#[test]
fn truecolor_animation_with_a_hole_survives_optimization() {
    let frames = vec![
        (Canvas::new(20, 20, gradient), Delay::new(1, 10)),
        (
            Canvas::new(20, 20, gradient).with(5, 5, 3, Pixel::opaque(255, 255, 255)),
            Delay::new(1, 10),
        ),
        (
            Canvas::new(20, 20, gradient)
                .with(7, 6, 3, Pixel::opaque(255, 255, 255))
                .with(0, 0, 2, CLEAR),
            Delay::new(1, 10),
        ),
        (Canvas::new(20, 20, gradient), Delay::new(1, 10)),
    ];
    let input = build(&frames, None, &[]);
    for options in targets() {
        let output = optimize(&input, &options).unwrap();
        assert_same_animation(&input, &output);
        let optimized = APNG::decode(&input, &options).unwrap().optimize().unwrap();
        assert_eq!(optimized.sequence().color_model().bytes_per_pixel(), 3);
    }
}

#[test]
fn translucent_animation_keeps_its_alpha_channel() {
    let frames = vec![
        (
            Canvas::new(20, 20, gradient).with(2, 2, 4, Pixel::new(10, 200, 10, 60)),
            Delay::new(1, 10),
        ),
        (
            Canvas::new(20, 20, gradient).with(3, 3, 4, Pixel::new(10, 200, 10, 60)),
            Delay::new(1, 10),
        ),
        (
            Canvas::new(20, 20, |_, _| CLEAR).with(9, 9, 5, Pixel::new(1, 2, 3, 255)),
            Delay::new(1, 10),
        ),
    ];
    let input = build(&frames, None, &[]);
    for options in targets() {
        let output = optimize(&input, &options).unwrap();
        assert_same_animation(&input, &output);
    }
}

#[test]
fn default_image_is_preserved() {
    let default_image = Canvas::new(8, 8, |x, _| Pixel::opaque(x as u8 * 30, 0, 0));
    let input = build(&sprite_frames(), Some(&default_image), &[]);
    for options in targets() {
        let output = optimize(&input, &options).unwrap();
        assert_same_animation(&input, &output);
        let names = chunk_names(&output);
        let first_idat = names.iter().position(|n| n == "IDAT").unwrap();
        assert!(!names[..first_idat].contains(&"fcTL".to_string()));
    }
}

#[test]
fn webp_target_avoids_previous_disposal_and_odd_offsets() {
    let frames: Vec<_> = (0..6)
        .map(|i| {
            (
                Canvas::new(20, 20, gradient).with(1 + i * 3, 3 + i, 3, Pixel::opaque(0, 0, 0)),
                Delay::new(1, 10),
            )
        })
        .collect();
    let input = build(&frames, None, &[]);
    let output = optimize(&input, &Options::for_target(Target::WebP)).unwrap();
    assert_same_animation(&input, &output);

    let (rest, _) = parse_signature(&output).unwrap();
    let controls: Vec<_> = iter_chunks(rest)
        .filter_map(|chunk| match chunk.unwrap() {
            Chunk::fcTL(fctl) => Some(fctl),
            _ => None,
        })
        .collect();
    assert_eq!(controls.len(), 6);
    for fctl in &controls {
        assert_ne!(fctl.dispose_op, 2);
        assert_eq!(fctl.x_offset % 2, 0);
        assert_eq!(fctl.y_offset % 2, 0);
    }
    assert_eq!(controls.last().unwrap().dispose_op, 0);
}

fn noise(x: u32, y: u32) -> Pixel {
    let seed = x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503);
    Pixel::opaque(seed as u8, (seed >> 8) as u8, (seed >> 16) as u8)
}

fn frame_controls(png: &[u8]) -> Vec<(u8, u8)> {
    let (rest, _) = parse_signature(png).unwrap();
    iter_chunks(rest)
        .filter_map(|chunk| match chunk.unwrap() {
            Chunk::fcTL(fctl) => Some((fctl.dispose_op, fctl.blend_op)),
            _ => None,
        })
        .collect()
}

#[test]
fn blinking_sprite_is_disposed_to_previous() {
    let frames = vec![
        (Canvas::new(20, 20, noise), Delay::new(1, 10)),
        (
            Canvas::new(20, 20, noise).with(5, 5, 8, Pixel::opaque(255, 255, 255)),
            Delay::new(1, 10),
        ),
        (Canvas::new(20, 20, noise), Delay::new(1, 10)),
    ];
    let input = build(&frames, None, &[]);
    let output = optimize(&input, &Options::for_target(Target::Apng)).unwrap();
    assert_same_animation(&input, &output);

    let controls = frame_controls(&output);
    assert_eq!(controls.len(), 3);
    // Restoring the canvas brings back the first frame for free.
    assert_eq!(controls[1].0, 2);
    assert_eq!(controls[2].0, 0);
}

#[test]
fn scattered_changes_are_blended_over() {
    let frames = vec![
        (Canvas::new(20, 20, gradient), Delay::new(1, 10)),
        (
            Canvas::new(20, 20, gradient)
                .with(1, 1, 1, Pixel::opaque(255, 255, 255))
                .with(18, 18, 1, Pixel::opaque(255, 255, 255)),
            Delay::new(1, 10),
        ),
    ];
    let input = build(&frames, None, &[]);
    let output = optimize(&input, &Options::for_target(Target::Apng)).unwrap();
    assert_same_animation(&input, &output);

    let controls = frame_controls(&output);
    assert_eq!(controls, vec![(0, 0), (0, 1)]);
}

#[test]
fn small_animation_layout() {
    let blank = || Canvas::new(4, 4, |_, _| CLEAR);
    let frames = vec![
        (blank().with(0, 0, 1, RED), Delay::new(1, 10)),
        (
            blank()
                .with(0, 0, 1, RED)
                .with(2, 2, 1, Pixel::opaque(0, 0, 200)),
            Delay::new(1, 10),
        ),
    ];
    let output = optimize(&build(&frames, None, &[]), &Options::default()).unwrap();
    insta::assert_debug_snapshot!(chunk_names(&output), @r###"
    [
        "IHDR",
        "acTL",
        "PLTE",
        "tRNS",
        "fcTL",
        "IDAT",
        "fcTL",
        "fdAT",
        "IEND",
    ]
    "###);
}

#[test]
fn opaque_still_image_with_many_colors_stays_still() {
    let canvas = Canvas::new(20, 20, gradient);
    let input = build(&[(canvas, Delay::new(1, 10))], None, &[]);
    let output = optimize(&input, &Options::default()).unwrap();
    // Truecolor still records an unused color as its key.
    insta::assert_debug_snapshot!(chunk_names(&output), @r###"
    [
        "IHDR",
        "tRNS",
        "IDAT",
        "IEND",
    ]
    "###);
    assert_same_animation(&input, &output);
}

#[test]
fn metadata_is_copied_only_when_asked() {
    let extra: [(&[u8; 4], &[u8]); 2] = [(b"tEXt", b"Title\0Sprite"), (b"bKGD", &[0, 0, 0, 0, 0, 0])];
    let input = build(&sprite_frames(), None, &extra);

    let output = optimize(&input, &Options::default()).unwrap();
    assert!(!chunk_names(&output).contains(&"tEXt".to_string()));

    let options = Options {
        keep_metadata: true,
        ..Options::default()
    };
    let names = chunk_names(&optimize(&input, &options).unwrap());
    assert!(names.contains(&"tEXt".to_string()));
    assert!(!names.contains(&"bKGD".to_string()));
}

use miniz_oxide::deflate::compress_to_vec_zlib;
use simple_apng::{
    compose_sequence, decode_stream, writer::ChunkWriter, BlendOp, Delay, DisposeOp, Error,
    FrameControl, Options, Pixel, Rect, APNG,
};

fn ihdr(width: u32, height: u32, bit_depth: u8, color_type: u8, interlace: u8) -> Vec<u8> {
    let mut data = width.to_be_bytes().to_vec();
    data.extend(height.to_be_bytes());
    data.extend([bit_depth, color_type, 0, 0, interlace]);
    data
}

fn actl(num_frames: u32, num_plays: u32) -> Vec<u8> {
    let mut data = num_frames.to_be_bytes().to_vec();
    data.extend(num_plays.to_be_bytes());
    data
}

/// Unfiltered RGBA rows, zlib compressed.
fn rgba_data(width: usize, pixels: &[Pixel]) -> Vec<u8> {
    let mut raw = vec![];
    for row in pixels.chunks(width) {
        raw.push(0);
        raw.extend(row.iter().flat_map(|p| p.to_bytes()));
    }
    compress_to_vec_zlib(&raw, 6)
}

fn control(rect: Rect, dispose_op: DisposeOp, blend_op: BlendOp) -> FrameControl {
    FrameControl {
        rect,
        delay: Delay::new(1, 10),
        dispose_op,
        blend_op,
    }
}

fn solid(rect: Rect, pixel: Pixel) -> Vec<u8> {
    rgba_data(
        rect.width as usize,
        &vec![pixel; (rect.width * rect.height) as usize],
    )
}

const RED: Pixel = Pixel::opaque(255, 0, 0);
const BLUE: Pixel = Pixel::opaque(0, 0, 255);
const WHITE: Pixel = Pixel::opaque(255, 255, 255);

fn animation_with_default_image() -> Vec<u8> {
    let mut png = ChunkWriter::new();
    png.write_chunk(b"IHDR", &ihdr(4, 2, 8, 6, 0));
    png.write_chunk(b"acTL", &actl(3, 2));
    png.write_chunk(b"tEXt", b"Title\0Three frames");
    png.write_image_data(&solid(Rect::canvas(4, 2), RED), true);

    let left = Rect::new(0, 0, 2, 2);
    png.write_frame_control(&control(left, DisposeOp::None, BlendOp::Over));
    png.write_image_data(&solid(left, BLUE), false);

    let right = Rect::new(2, 0, 2, 2);
    png.write_frame_control(&control(right, DisposeOp::Previous, BlendOp::Over));
    png.write_image_data(&solid(right, Pixel::new(0, 255, 0, 128)), false);

    let corner = Rect::new(0, 0, 1, 1);
    png.write_frame_control(&control(corner, DisposeOp::None, BlendOp::Source));
    png.write_image_data(&solid(corner, WHITE), false);
    png.finish()
}

#[test]
fn frames_are_composed_over_the_default_image() {
    let stream = decode_stream(&animation_with_default_image(), &Options::default()).unwrap();
    assert!(stream.first_frame_is_default_image);
    assert_eq!(stream.loop_count, 2);
    assert_eq!(stream.frames.len(), 4);
    assert_eq!(stream.ancillary.len(), 1);
    assert_eq!(&stream.ancillary[0].chunk_type, b"tEXt");

    let sequence = compose_sequence(stream).unwrap();
    let frames = sequence.displayed_frames();
    assert_eq!(frames.len(), 3);

    assert_eq!(frames[0].get(1, 1), BLUE);
    assert_eq!(frames[0].get(2, 0), RED);

    assert_eq!(frames[1].get(0, 0), BLUE);
    assert_eq!(frames[1].get(3, 1), Pixel::new(127, 128, 0, 255));

    // The blended half was disposed back to what the previous frame showed.
    assert_eq!(frames[2].get(0, 0), WHITE);
    assert_eq!(frames[2].get(1, 0), BLUE);
    assert_eq!(frames[2].get(3, 1), RED);
}

#[test]
fn facade_reports_the_displayed_duration() {
    let apng = APNG::decode(&animation_with_default_image(), &Options::default()).unwrap();
    let sequence = apng.sequence();
    assert!(sequence.first_frame_is_default_image());
    assert_eq!(sequence.duration(), Delay::new(3, 10));
    assert_eq!(sequence.duration_millis(), 300);

    let sequence = apng.into_sequence();
    let kept: Vec<_> = sequence
        .ancillary_chunks()
        .iter()
        .map(|c| c.chunk_type)
        .collect();
    assert_eq!(kept, vec![*b"tEXt"]);
}

#[test]
fn plain_png_is_a_single_frame() {
    let mut png = ChunkWriter::new();
    png.write_chunk(b"IHDR", &ihdr(2, 1, 8, 6, 0));
    png.write_chunk(b"gAMA", &45455u32.to_be_bytes());
    png.write_image_data(&rgba_data(2, &[RED, Pixel::new(1, 2, 3, 4)]), true);
    png.write_chunk(b"tEXt", b"Comment\0after the image");

    let stream = decode_stream(&png.finish(), &Options::default()).unwrap();
    assert!(!stream.first_frame_is_default_image);
    assert_eq!(stream.frames.len(), 1);
    assert_eq!(stream.frames[0].image.get(1, 0), Pixel::new(1, 2, 3, 4));
    let names: Vec<_> = stream.ancillary.iter().map(|c| c.chunk_type).collect();
    assert_eq!(names, vec![*b"gAMA"]);
}

#[test]
fn frame_control_without_animation_control_is_ignored() {
    let mut png = ChunkWriter::new();
    png.write_chunk(b"IHDR", &ihdr(2, 1, 8, 6, 0));
    png.write_frame_control(&control(
        Rect::new(1, 0, 1, 1),
        DisposeOp::None,
        BlendOp::Source,
    ));
    png.write_image_data(&rgba_data(2, &[RED, BLUE]), true);

    let stream = decode_stream(&png.finish(), &Options::default()).unwrap();
    assert_eq!(stream.frames.len(), 1);
    assert_eq!(stream.frames[0].control.rect, Rect::canvas(2, 1));
}

#[test]
fn interlaced_greyscale_is_deinterlaced() {
    // Adam7 passes of a 2x2 image: (0,0), then (1,0), then the second row.
    let raw = [0, 10, 0, 20, 0, 30, 40];
    let mut png = ChunkWriter::new();
    png.write_chunk(b"IHDR", &ihdr(2, 2, 8, 0, 1));
    png.write_image_data(&compress_to_vec_zlib(&raw, 6), true);

    let stream = decode_stream(&png.finish(), &Options::default()).unwrap();
    let image = &stream.frames[0].image;
    assert_eq!(image.get(0, 0), Pixel::opaque(10, 10, 10));
    assert_eq!(image.get(1, 0), Pixel::opaque(20, 20, 20));
    assert_eq!(image.get(0, 1), Pixel::opaque(30, 30, 30));
    assert_eq!(image.get(1, 1), Pixel::opaque(40, 40, 40));
}

#[test]
fn frame_data_needs_a_frame_control() {
    let mut png = ChunkWriter::new();
    png.write_chunk(b"IHDR", &ihdr(1, 1, 8, 6, 0));
    png.write_chunk(b"acTL", &actl(1, 0));
    png.write_image_data(&rgba_data(1, &[RED]), true);
    png.write_image_data(&rgba_data(1, &[BLUE]), false);

    let err = decode_stream(&png.finish(), &Options::default()).unwrap_err();
    assert!(matches!(err, Error::MalformedContainer(_)));
}

#[test]
fn frame_control_without_data_is_rejected() {
    let mut png = ChunkWriter::new();
    png.write_chunk(b"IHDR", &ihdr(1, 1, 8, 6, 0));
    png.write_chunk(b"acTL", &actl(2, 0));
    let pixel = Rect::new(0, 0, 1, 1);
    png.write_frame_control(&control(pixel, DisposeOp::None, BlendOp::Source));
    png.write_image_data(&solid(pixel, RED), true);
    png.write_frame_control(&control(pixel, DisposeOp::None, BlendOp::Source));

    let err = decode_stream(&png.finish(), &Options::default()).unwrap_err();
    assert!(matches!(err, Error::MalformedContainer(_)));
}

#[test]
fn frames_outside_the_canvas_are_rejected() {
    let mut png = ChunkWriter::new();
    png.write_chunk(b"IHDR", &ihdr(4, 2, 8, 6, 0));
    png.write_chunk(b"acTL", &actl(1, 0));
    let rect = Rect::new(1, 1, 4, 2);
    png.write_frame_control(&control(rect, DisposeOp::None, BlendOp::Source));
    png.write_image_data(&solid(rect, RED), true);

    let err = decode_stream(&png.finish(), &Options::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedGeometry(_)));
}

#[test]
fn unknown_critical_chunks_are_rejected() {
    let mut png = ChunkWriter::new();
    png.write_chunk(b"IHDR", &ihdr(1, 1, 8, 6, 0));
    png.write_chunk(b"ZZZZ", b"");
    png.write_image_data(&rgba_data(1, &[RED]), true);

    let err = decode_stream(&png.finish(), &Options::default()).unwrap_err();
    assert!(matches!(err, Error::MalformedContainer(_)));
}

#[test]
fn bad_crc_is_fatal_only_in_strict_mode() {
    let mut png = ChunkWriter::new();
    png.write_chunk(b"IHDR", &ihdr(1, 1, 8, 6, 0));
    png.write_chunk(b"tEXt", b"a\0b");
    png.write_image_data(&rgba_data(1, &[RED]), true);
    let mut bytes = png.finish();
    // Last CRC byte of the tEXt chunk: signature, IHDR, then 4 + 4 + 3 + 4.
    bytes[8 + 25 + 14] ^= 0xff;

    assert!(decode_stream(&bytes, &Options::default()).is_ok());
    let strict = Options {
        strict_crc: true,
        ..Options::default()
    };
    let err = decode_stream(&bytes, &strict).unwrap_err();
    assert!(matches!(err, Error::MalformedContainer(_)));
}

#[test]
fn missing_signature_is_rejected() {
    let err = decode_stream(b"GIF89a", &Options::default()).unwrap_err();
    assert!(matches!(err, Error::MalformedContainer(_)));
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gifkit::{Encoder, Frame, Gif, Octree};
use pix::rgb::{SRgb8, SRgba8};
use pix::Raster;
use std::io::Cursor;

/// Make a gradient raster
fn gradient(shift: u8) -> Raster<SRgba8> {
    let mut raster = Raster::with_clear(128, 128);
    let width = raster.width() as usize;
    for (n, p) in raster.pixels_mut().iter_mut().enumerate() {
        let x = (n % width) as u8;
        let y = (n / width) as u8;
        *p = SRgba8::new(x.wrapping_add(shift), y, x ^ y, 255);
    }
    raster
}

fn encode_frames(crit: &mut Criterion) {
    let mut gif = Gif::quantizing_image(&gradient(0)).unwrap();
    for i in 0..8 {
        gif.push_frame(Frame::new(gradient(i * 16)).unwrap());
    }
    for threads in [1, 4] {
        crit.bench_function(&format!("encode_frames_{threads}"), |b| {
            b.iter(|| {
                let buf = Cursor::new(Vec::with_capacity(32768));
                Encoder::new(black_box(buf))
                    .threads(Some(threads))
                    .encode(black_box(&gif))
                    .unwrap();
            })
        });
    }
}

fn build_octree(crit: &mut Criterion) {
    let colors: Vec<SRgb8> = (0..65536u32)
        .map(|n| SRgb8::new(n as u8, (n >> 8) as u8, (n >> 3) as u8))
        .collect();
    crit.bench_function("build_octree", |b| {
        b.iter(|| black_box(Octree::from_colors(black_box(&colors), 255)))
    });
}

criterion_group!(benches, encode_frames, build_octree);
criterion_main!(benches);

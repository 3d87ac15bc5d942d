//! Integration tests for tiled images and pixel cursors.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tessella_core::image::{TileIndex, TileLayout, TileObserver, TiledImage};
use tessella_core::io::{open_tiff, write_tiff, TiffOptions};
use tessella_core::iterator::{PixelIterator, ReadCursor, WritablePixelIterator, WriteCursor};
use tessella_core::raster::{band_statistics, GeoTransform, Interleave, Raster, Rect, SampleType};
use tessella_core::Error;

fn layout(sample_type: SampleType, interleave: Interleave) -> TileLayout {
    TileLayout::new(11, 9, 3, sample_type)
        .with_origin(-2, 5)
        .with_tile_size(4, 3)
        .with_interleave(interleave)
}

#[test]
fn test_full_iteration_visits_every_sample_once_in_order() {
    let layout = layout(SampleType::U16, Interleave::Pixel);
    let image = TiledImage::new(layout).unwrap();
    let mut cursor = PixelIterator::new(&image).unwrap();

    let mut seen = HashSet::new();
    let mut previous: Option<(TileIndex, i64, i64, usize)> = None;
    while cursor.next().unwrap() {
        let (x, y, band) = (cursor.x(), cursor.y(), cursor.band());
        assert!(cursor.boundary().contains(x, y));
        assert!(seen.insert((x, y, band)), "({x}, {y}, {band}) visited twice");

        let tile = layout.tile_of(x, y);
        if let Some((prev_tile, px, py, pb)) = previous {
            if prev_tile == tile {
                // band, then x, then y
                assert!((y, x, band) > (py, px, pb));
            } else {
                assert!((tile.ty, tile.tx) > (prev_tile.ty, prev_tile.tx));
            }
        }
        previous = Some((tile, x, y, band));
    }

    assert_eq!(seen.len(), 11 * 9 * 3);
    assert!(!cursor.next().unwrap());
}

#[test]
fn test_write_then_read_with_fresh_cursor() {
    for interleave in [Interleave::Pixel, Interleave::Band] {
        for sample_type in [SampleType::U8, SampleType::I32, SampleType::F32, SampleType::F64] {
            let mut image = TiledImage::new(layout(sample_type, interleave)).unwrap();

            let mut writer = WritablePixelIterator::new(&mut image).unwrap();
            while writer.next().unwrap() {
                let v = ((writer.x() + 2) * 7 + (writer.y() - 5) * 3 + writer.band() as i64) % 250;
                writer.set_sample(v as i32).unwrap();
            }
            writer.close().unwrap();
            drop(writer);

            let mut reader = PixelIterator::new(&image).unwrap();
            while reader.next().unwrap() {
                let v = ((reader.x() + 2) * 7 + (reader.y() - 5) * 3 + reader.band() as i64) % 250;
                assert_eq!(reader.sample().unwrap(), v as i32, "{sample_type} {interleave:?}");
            }
        }
    }
}

#[test]
fn test_float_storage_truncates_doubles() {
    let mut image = TiledImage::new(layout(SampleType::F32, Interleave::Pixel)).unwrap();
    let value = 0.1f64;
    {
        let mut writer = WritablePixelIterator::new(&mut image).unwrap();
        writer.move_to(3, 7, 2).unwrap();
        writer.set_sample_f64(value).unwrap();
    }

    let mut reader = PixelIterator::new(&image).unwrap();
    let stored = reader.sample_at(3, 7, 2).unwrap();
    assert_eq!(stored, value as f32 as f64);
    assert_ne!(stored, value);
}

#[derive(Default)]
struct Ledger {
    events: Mutex<Vec<(TileIndex, bool)>>,
}

impl TileObserver for Ledger {
    fn tile_update(&self, tile: TileIndex, will_be_writable: bool) {
        self.events.lock().unwrap().push((tile, will_be_writable));
    }
}

#[test]
fn test_closing_releases_every_acquired_tile() {
    let mut image = TiledImage::new(layout(SampleType::F64, Interleave::Pixel)).unwrap();
    let ledger = Arc::new(Ledger::default());
    image.add_observer(ledger.clone());

    let mut writer =
        WritablePixelIterator::with_area(&mut image, Rect::new(0, 6, 6, 5)).unwrap();
    let mut steps = 0;
    while writer.next().unwrap() {
        writer.set_sample_f64(1.0).unwrap();
        steps += 1;
        if steps == 40 {
            break;
        }
    }
    writer.close().unwrap();
    drop(writer);

    assert!(!image.has_tile_writers());
    let events = ledger.events.lock().unwrap();
    let mut outstanding = 0i32;
    for (_, acquired) in events.iter() {
        outstanding += if *acquired { 1 } else { -1 };
        assert!((0..=1).contains(&outstanding));
    }
    assert_eq!(outstanding, 0);
}

#[test]
fn test_source_failure_mid_walk_leaves_no_writers() {
    let failing = TileIndex::new(1, 0);
    let mut image = TiledImage::with_source(
        layout(SampleType::U8, Interleave::Pixel),
        move |l: &TileLayout, t: TileIndex, b: Rect| {
            if t == failing {
                return Err(Error::Other(format!("tile {} unreadable", t)));
            }
            Ok(Raster::new(b, l.bands, l.sample_type))
        },
    )
    .unwrap();
    let ledger = Arc::new(Ledger::default());
    image.add_observer(ledger.clone());

    let mut writer = WritablePixelIterator::new(&mut image).unwrap();
    let mut written = 0;
    let failure = loop {
        match writer.next() {
            Ok(true) => {
                writer.set_sample_f64(5.0).unwrap();
                written += 1;
            }
            Ok(false) => panic!("walk ended without reaching {}", failing),
            Err(e) => break e,
        }
    };
    drop(writer);

    assert!(matches!(failure, Error::Other(_)));
    // Tile (0, 0) is 4 x 3 pixels with 3 bands
    assert_eq!(written, 4 * 3 * 3);
    assert!(!image.has_tile_writers());
    assert!(image.writable_tiles().is_empty());

    let events = ledger.events.lock().unwrap();
    let acquired = events.iter().filter(|(_, a)| *a).count();
    assert_eq!(acquired, events.len() - acquired);
    assert_eq!(image.get_f64(-2, 5, 0).unwrap(), 5.0);
}

#[test]
fn test_sub_area_iteration_and_statistics() {
    let mut image = TiledImage::new(layout(SampleType::I16, Interleave::Band)).unwrap();
    image.set_f64(1, 8, 0, -4.0).unwrap();
    image.set_f64(2, 9, 0, 10.0).unwrap();

    let area = Rect::new(0, 7, 4, 4);
    let mut cursor = PixelIterator::with_area(&image, area).unwrap();
    let stats = band_statistics(&mut cursor).unwrap();

    assert_eq!(stats.len(), 3);
    assert_eq!(stats[0].valid_count, 16);
    assert_eq!(stats[0].min, Some(-4.0));
    assert_eq!(stats[0].max, Some(10.0));
    assert_eq!(stats[1].max, Some(0.0));
}

#[test]
fn test_copy_between_images_with_different_storage() {
    let mut source = TiledImage::new(layout(SampleType::F64, Interleave::Band)).unwrap();
    {
        let mut writer = WritablePixelIterator::new(&mut source).unwrap();
        while writer.next().unwrap() {
            writer.set_sample_f64(writer.x() as f64 * 1.5).unwrap();
        }
    }

    let mut target = TiledImage::new(layout(SampleType::I32, Interleave::Pixel)).unwrap();
    {
        let mut copier = WritablePixelIterator::with_source(&source, &mut target).unwrap();
        while copier.next().unwrap() {
            let v = copier.sample_f64().unwrap();
            copier.set_sample_f64(v).unwrap();
        }
    }

    // 4.5 and -1.5 both truncate toward zero
    assert_eq!(target.get_f64(3, 6, 1).unwrap(), 4.0);
    assert_eq!(target.get_f64(-1, 6, 1).unwrap(), -1.0);
    assert!(!target.has_tile_writers());
}

#[test]
fn test_tiff_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiles.tif");

    let mut image = TiledImage::new(TileLayout::new(20, 13, 1, SampleType::F32).with_tile_size(8, 8))
        .unwrap()
        .with_transform(GeoTransform::new(100.0, 200.0, 0.5, -0.5));
    {
        let mut writer = WritablePixelIterator::new(&mut image).unwrap();
        while writer.next().unwrap() {
            writer
                .set_sample_f32((writer.x() * 100 + writer.y()) as f32)
                .unwrap();
        }
    }

    write_tiff(&image, &path, &TiffOptions::default()).unwrap();
    let read = open_tiff(&path).unwrap();

    assert_eq!(read.bounds(), image.bounds());
    assert_eq!(read.transform(), image.transform());
    assert_eq!(read.layout().tile_height, 8);

    let mut cursor = PixelIterator::new(&read).unwrap();
    while cursor.next().unwrap() {
        assert_eq!(
            cursor.sample_f32().unwrap(),
            (cursor.x() * 100 + cursor.y()) as f32
        );
    }
}

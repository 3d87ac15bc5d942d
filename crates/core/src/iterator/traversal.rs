//! Position bookkeeping shared by the cursors

use crate::error::{Error, Result};
use crate::image::{TileIndex, TileLayout, TileRange};
use crate::raster::Rect;

/// Current sample of a traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Position {
    pub tile: TileIndex,
    /// Part of the tile inside the cursor area
    pub tile_area: Rect,
    pub x: i64,
    pub y: i64,
    pub band: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Before,
    At,
    Done,
}

/// What changed on the last move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Next sample in memory order of a pixel-interleaved tile
    Sample,
    /// Same tile, new row or arbitrary jump
    Row,
    /// Entered a new tile
    Tile(TileIndex),
    Finished,
}

/// Walks `(band, x, y)` inside each tile, tiles row-major.
#[derive(Debug, Clone)]
pub(crate) struct Traversal {
    layout: TileLayout,
    area: Rect,
    tiles: TileRange,
    state: State,
    pos: Position,
}

impl Traversal {
    pub(crate) fn new(layout: &TileLayout, area: Rect) -> Result<Self> {
        let area = area.intersection(&layout.bounds).ok_or(Error::NoIntersection {
            area,
            bounds: layout.bounds,
        })?;
        let tiles = layout.tile_range(&area);
        let first = TileIndex::new(tiles.min_tx, tiles.min_ty);
        let tile_area = layout.tile_rect(first).intersection(&area).unwrap_or(area);

        Ok(Self {
            layout: *layout,
            area,
            tiles,
            state: State::Before,
            pos: Position {
                tile: first,
                tile_area,
                x: tile_area.x,
                y: tile_area.y,
                band: 0,
            },
        })
    }

    pub(crate) fn area(&self) -> Rect {
        self.area
    }

    pub(crate) fn tiles(&self) -> TileRange {
        self.tiles
    }

    pub(crate) fn bands(&self) -> usize {
        self.layout.bands
    }

    pub(crate) fn position(&self) -> Position {
        self.pos
    }

    /// The current position, or `None` before the start and after the end
    pub(crate) fn current(&self) -> Option<Position> {
        (self.state == State::At).then_some(self.pos)
    }

    pub(crate) fn advance(&mut self) -> Step {
        match self.state {
            State::Done => Step::Finished,
            State::Before => self.enter(TileIndex::new(self.tiles.min_tx, self.tiles.min_ty)),
            State::At => {
                let bands = self.layout.bands;
                let pos = &mut self.pos;

                pos.band += 1;
                if pos.band < bands {
                    return Step::Sample;
                }
                pos.band = 0;
                pos.x += 1;
                if pos.x < pos.tile_area.max_x() {
                    return Step::Sample;
                }
                pos.x = pos.tile_area.x;
                pos.y += 1;
                if pos.y < pos.tile_area.max_y() {
                    return Step::Row;
                }

                let current = pos.tile;
                match self.next_tile(current) {
                    Some(tile) => self.enter(tile),
                    None => self.finish(),
                }
            }
        }
    }

    fn next_tile(&self, tile: TileIndex) -> Option<TileIndex> {
        if tile.tx < self.tiles.max_tx {
            Some(TileIndex::new(tile.tx + 1, tile.ty))
        } else if tile.ty < self.tiles.max_ty {
            Some(TileIndex::new(self.tiles.min_tx, tile.ty + 1))
        } else {
            None
        }
    }

    fn enter(&mut self, tile: TileIndex) -> Step {
        // Every tile of the range overlaps the area
        match self.layout.tile_rect(tile).intersection(&self.area) {
            Some(tile_area) => {
                self.pos = Position {
                    tile,
                    tile_area,
                    x: tile_area.x,
                    y: tile_area.y,
                    band: 0,
                };
                self.state = State::At;
                Step::Tile(tile)
            }
            None => self.finish(),
        }
    }

    /// Jump to `(x, y, band)`; iteration continues from there
    pub(crate) fn move_to(&mut self, x: i64, y: i64, band: usize) -> Result<Step> {
        if !self.area.contains(x, y) {
            return Err(Error::OutOfBounds {
                x,
                y,
                bounds: self.area,
            });
        }
        if band >= self.layout.bands {
            return Err(Error::InvalidBand {
                band,
                bands: self.layout.bands,
            });
        }

        let tile = self.layout.tile_of(x, y);
        let tile_area = self
            .layout
            .tile_rect(tile)
            .intersection(&self.area)
            .ok_or(Error::TileOutOfRange { tile })?;
        let same_tile = self.state == State::At && self.pos.tile == tile;

        self.pos = Position {
            tile,
            tile_area,
            x,
            y,
            band,
        };
        self.state = State::At;
        Ok(if same_tile { Step::Row } else { Step::Tile(tile) })
    }

    pub(crate) fn rewind(&mut self) {
        self.state = State::Before;
    }

    pub(crate) fn finish(&mut self) -> Step {
        self.state = State::Done;
        Step::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::SampleType;

    fn visit(traversal: &mut Traversal) -> Vec<(i64, i64, usize)> {
        let mut seen = Vec::new();
        while traversal.advance() != Step::Finished {
            let p = traversal.position();
            seen.push((p.x, p.y, p.band));
        }
        seen
    }

    #[test]
    fn test_order_within_and_across_tiles() {
        let layout = TileLayout::new(4, 2, 2, SampleType::U8).with_tile_size(2, 2);
        let mut traversal = Traversal::new(&layout, layout.bounds).unwrap();
        let seen = visit(&mut traversal);

        assert_eq!(seen.len(), 16);
        assert_eq!(
            &seen[..8],
            &[
                (0, 0, 0),
                (0, 0, 1),
                (1, 0, 0),
                (1, 0, 1),
                (0, 1, 0),
                (0, 1, 1),
                (1, 1, 0),
                (1, 1, 1)
            ]
        );
        assert_eq!(seen[8], (2, 0, 0));
    }

    #[test]
    fn test_steps_report_row_and_tile_changes() {
        let layout = TileLayout::new(4, 2, 1, SampleType::U8).with_tile_size(2, 2);
        let mut traversal = Traversal::new(&layout, layout.bounds).unwrap();
        let steps: Vec<_> = std::iter::from_fn(|| match traversal.advance() {
            Step::Finished => None,
            step => Some(step),
        })
        .collect();

        assert_eq!(
            steps,
            vec![
                Step::Tile(TileIndex::new(0, 0)),
                Step::Sample,
                Step::Row,
                Step::Sample,
                Step::Tile(TileIndex::new(1, 0)),
                Step::Sample,
                Step::Row,
                Step::Sample,
            ]
        );
        assert_eq!(traversal.advance(), Step::Finished);
    }

    #[test]
    fn test_sub_area_clips_tiles() {
        let layout = TileLayout::new(6, 6, 1, SampleType::U8).with_tile_size(4, 4);
        let mut traversal = Traversal::new(&layout, Rect::new(3, 3, 2, 2)).unwrap();
        let seen = visit(&mut traversal);
        assert_eq!(seen, vec![(3, 3, 0), (4, 3, 0), (3, 4, 0), (4, 4, 0)]);
    }

    #[test]
    fn test_disjoint_area_is_rejected() {
        let layout = TileLayout::new(6, 6, 1, SampleType::U8);
        assert!(matches!(
            Traversal::new(&layout, Rect::new(10, 0, 2, 2)),
            Err(Error::NoIntersection { .. })
        ));
    }

    #[test]
    fn test_move_to_checks_bounds() {
        let layout = TileLayout::new(6, 6, 2, SampleType::U8).with_tile_size(3, 3);
        let mut traversal = Traversal::new(&layout, layout.bounds).unwrap();
        assert_eq!(traversal.move_to(4, 1, 1).unwrap(), Step::Tile(TileIndex::new(1, 0)));
        assert_eq!(traversal.move_to(5, 2, 0).unwrap(), Step::Row);
        assert!(traversal.move_to(6, 0, 0).is_err());
        assert!(traversal.move_to(0, 0, 2).is_err());
        // Continues from the jump target
        assert_eq!(traversal.advance(), Step::Sample);
        assert_eq!(traversal.position().band, 1);
    }
}

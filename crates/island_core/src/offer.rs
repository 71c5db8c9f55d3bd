//! Tile offer queue: the tiles handed to the player one at a time.
//!
//! The queue starts with `queue_size` weighted draws from every offerable
//! variant. Later refills only draw tiles that still fit somewhere, using the
//! solver's valid tile set, and fall back to every offerable variant when
//! that set has nothing offerable in it.

use crate::config::OfferConfig;
use crate::rng::TileRng;
use crate::wfc::catalog::{CatalogError, TileCatalog, TileId};
use crate::wfc::scheduler::choose_tile;
use crate::wfc::tile::TileKey;
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Errors acting on the offered tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferError {
    /// No tile is on offer.
    EmptyQueue,
    Catalog(CatalogError),
}

impl fmt::Display for OfferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferError::EmptyQueue => write!(f, "no tile on offer"),
            OfferError::Catalog(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for OfferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OfferError::Catalog(e) => Some(e),
            OfferError::EmptyQueue => None,
        }
    }
}

impl From<CatalogError> for OfferError {
    fn from(e: CatalogError) -> Self {
        OfferError::Catalog(e)
    }
}

#[derive(Debug, Clone)]
pub struct TileOffer {
    queue: VecDeque<TileId>,
    offerable: Vec<TileId>,
    /// Draws made so far, initial fill included.
    drawn: usize,
    queue_size: usize,
}

impl TileOffer {
    pub fn new(catalog: &TileCatalog, config: &OfferConfig, rng: &mut dyn TileRng) -> Self {
        let offerable = catalog
            .variants()
            .iter()
            .enumerate()
            .filter(|(_, v)| !config.excluded_types.contains(&v.type_id))
            .map(|(id, _)| id)
            .collect();
        let mut offer = Self {
            queue: VecDeque::with_capacity(config.queue_size),
            offerable,
            drawn: 0,
            queue_size: config.queue_size,
        };
        for _ in 0..config.queue_size {
            offer.refill(catalog, &HashSet::new(), rng);
        }
        offer
    }

    /// The tile the player holds now.
    pub fn current(&self) -> Option<TileId> {
        self.queue.front().copied()
    }

    pub fn queued(&self) -> impl Iterator<Item = TileId> + '_ {
        self.queue.iter().copied()
    }

    pub fn offerable(&self) -> &[TileId] {
        &self.offerable
    }

    /// Remove the front tile after it was placed and draw a replacement.
    pub fn take(
        &mut self,
        catalog: &TileCatalog,
        valid: &HashSet<TileKey>,
        rng: &mut dyn TileRng,
    ) -> Option<TileId> {
        let taken = self.queue.pop_front()?;
        self.refill(catalog, valid, rng);
        Some(taken)
    }

    /// Throw the front tile away and draw a replacement.
    pub fn discard(
        &mut self,
        catalog: &TileCatalog,
        valid: &HashSet<TileKey>,
        rng: &mut dyn TileRng,
    ) -> Option<TileId> {
        self.take(catalog, valid, rng)
    }

    /// Turn the front tile +90°. The queue is unchanged on error.
    pub fn rotate_current(&mut self, catalog: &TileCatalog) -> Result<TileId, OfferError> {
        let front = self.queue.front_mut().ok_or(OfferError::EmptyQueue)?;
        let rotated = catalog.rotated(*front)?;
        *front = rotated;
        Ok(rotated)
    }

    fn refill(&mut self, catalog: &TileCatalog, valid: &HashSet<TileKey>, rng: &mut dyn TileRng) {
        let pool: Vec<TileId> = if self.drawn < self.queue_size {
            self.offerable.clone()
        } else {
            let fitting: Vec<TileId> = self
                .offerable
                .iter()
                .copied()
                .filter(|&id| valid.contains(&catalog.key(id)))
                .collect();
            if fitting.is_empty() {
                self.offerable.clone()
            } else {
                fitting
            }
        };
        if let Some(tile) = choose_tile(&pool, catalog, true, rng) {
            self.queue.push_back(tile);
            self.drawn += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::StdRandom;
    use crate::wfc::tile::{Rotation, Socket, TileArchetype};

    fn catalog() -> TileCatalog {
        let socket = Socket::new("s").symmetric().invariant();
        TileCatalog::new(
            vec![
                TileArchetype::uniform("solid", socket.clone()),
                TileArchetype::uniform("grass", socket.clone()),
                TileArchetype::uniform("path", socket.clone()).with_rotations(true, false, false),
                TileArchetype::uniform("pine", socket),
            ],
            true,
        )
        .unwrap()
    }

    fn config() -> OfferConfig {
        OfferConfig {
            queue_size: 3,
            excluded_types: vec!["solid".into()],
        }
    }

    #[test]
    fn test_initial_fill_skips_excluded_types() {
        let catalog = catalog();
        let mut rng = StdRandom::from_u64_seed(4);
        let offer = TileOffer::new(&catalog, &config(), &mut rng);
        assert_eq!(offer.queued().count(), 3);
        assert_eq!(offer.offerable().len(), 4);
        assert!(offer
            .queued()
            .all(|id| catalog.variant(id).type_id != "solid"));
    }

    #[test]
    fn test_refill_respects_valid_set() {
        let catalog = catalog();
        let mut rng = StdRandom::from_u64_seed(4);
        let mut offer = TileOffer::new(&catalog, &config(), &mut rng);
        let valid: HashSet<TileKey> = [TileKey::new("pine", Rotation::R0)].into_iter().collect();

        for _ in 0..3 {
            offer.take(&catalog, &valid, &mut rng).unwrap();
        }
        assert!(offer
            .queued()
            .all(|id| catalog.key(id) == TileKey::new("pine", Rotation::R0)));
    }

    #[test]
    fn test_refill_falls_back_without_valid_tiles() {
        let catalog = catalog();
        let mut rng = StdRandom::from_u64_seed(9);
        let mut offer = TileOffer::new(&catalog, &config(), &mut rng);
        let valid: HashSet<TileKey> = [TileKey::new("solid", Rotation::R0)].into_iter().collect();

        offer.discard(&catalog, &valid, &mut rng).unwrap();
        assert_eq!(offer.queued().count(), 3);
        assert!(offer
            .queued()
            .all(|id| catalog.variant(id).type_id != "solid"));
    }

    #[test]
    fn test_rotate_current() {
        let catalog = catalog();
        let mut rng = StdRandom::from_u64_seed(1);
        let mut offer = TileOffer::new(&catalog, &config(), &mut rng);
        let path = catalog.find(&TileKey::new("path", Rotation::R0)).unwrap();
        offer.queue[0] = path;

        let turned = offer.rotate_current(&catalog).unwrap();
        assert_eq!(catalog.key(turned), TileKey::new("path", Rotation::R90));
        let back = offer.rotate_current(&catalog).unwrap();
        assert_eq!(back, path);

        let grass = catalog.find(&TileKey::new("grass", Rotation::R0)).unwrap();
        offer.queue[0] = grass;
        assert!(matches!(
            offer.rotate_current(&catalog),
            Err(OfferError::Catalog(CatalogError::NoVariantFound { .. }))
        ));
        assert_eq!(offer.current(), Some(grass));
    }

    #[test]
    fn test_rotate_with_nothing_offered() {
        let catalog = catalog();
        let mut rng = StdRandom::from_u64_seed(1);
        let config = OfferConfig {
            queue_size: 0,
            ..config()
        };
        let mut offer = TileOffer::new(&catalog, &config, &mut rng);
        assert_eq!(offer.current(), None);

        let err = offer.rotate_current(&catalog).unwrap_err();
        assert_eq!(err, OfferError::EmptyQueue);
        assert_eq!(err.to_string(), "no tile on offer");
    }
}

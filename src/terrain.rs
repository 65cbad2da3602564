use serde::{Deserialize, Serialize};

/// Тип местности клетки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Terrain {
    /// Ещё не назначено (существует только во время генерации)
    #[default]
    Unknown,
    Lake,
    Ocean,
    DeepOcean,
    Glacier,
    Desert,
    Forest,
    Grassland,
    Hills,
    Jungle,
    Mountains,
    Plains,
    Swamp,
    Tundra,
}

impl Terrain {
    pub const ALL: [Terrain; 14] = [
        Terrain::Unknown,
        Terrain::Lake,
        Terrain::Ocean,
        Terrain::DeepOcean,
        Terrain::Glacier,
        Terrain::Desert,
        Terrain::Forest,
        Terrain::Grassland,
        Terrain::Hills,
        Terrain::Jungle,
        Terrain::Mountains,
        Terrain::Plains,
        Terrain::Swamp,
        Terrain::Tundra,
    ];

    #[must_use]
    pub fn is_water(self) -> bool {
        matches!(self, Terrain::Lake | Terrain::Ocean | Terrain::DeepOcean)
    }

    #[must_use]
    pub fn is_known(self) -> bool {
        self != Terrain::Unknown
    }

    /// Суша, включая ещё не определённую клетку острова
    #[must_use]
    pub fn is_land(self) -> bool {
        !self.is_water()
    }

    /// Гористость (0..=100)
    #[must_use]
    pub fn mountainous(self) -> i32 {
        match self {
            Terrain::Hills => 30,
            Terrain::Mountains => 100,
            _ => 0,
        }
    }

    /// Заболоченность (0..=100)
    #[must_use]
    pub fn wetness(self) -> i32 {
        match self {
            Terrain::Swamp => 100,
            Terrain::Jungle => 30,
            _ => 0,
        }
    }

    #[must_use]
    pub fn to_rgb(self) -> [u8; 3] {
        match self {
            Terrain::Unknown => [255, 0, 255],
            Terrain::Lake => [70, 130, 200],
            Terrain::Ocean => [0, 64, 128],
            Terrain::DeepOcean => [0, 32, 90],
            Terrain::Glacier => [220, 220, 255],
            Terrain::Desert => [220, 200, 130],
            Terrain::Forest => [60, 120, 60],
            Terrain::Grassland => [120, 190, 90],
            Terrain::Hills => [150, 140, 100],
            Terrain::Jungle => [30, 100, 30],
            Terrain::Mountains => [150, 150, 150],
            Terrain::Plains => [190, 190, 110],
            Terrain::Swamp => [80, 100, 60],
            Terrain::Tundra => [200, 220, 180],
        }
    }
}

/// Набор специальных отметок клетки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Specials(u8);

impl Specials {
    pub const NONE: Specials = Specials(0);
    pub const RIVER: Specials = Specials(1);
    pub const HUT: Specials = Specials(1 << 1);
    pub const RESOURCE: Specials = Specials(1 << 2);
    pub const POLLUTION: Specials = Specials(1 << 3);

    #[must_use]
    pub fn contains(self, other: Specials) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn insert(&mut self, other: Specials) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Specials) {
        self.0 &= !other.0;
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Specials {
    type Output = Specials;

    fn bitor(self, rhs: Specials) -> Specials {
        Specials(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_classes() {
        let water: Vec<_> = Terrain::ALL.iter().filter(|t| t.is_water()).collect();
        assert_eq!(water, [&Terrain::Lake, &Terrain::Ocean, &Terrain::DeepOcean]);
        // Неизвестная клетка острова считается сушей
        assert!(Terrain::Unknown.is_land());
        assert!(!Terrain::Unknown.is_known());
    }

    #[test]
    fn test_specials_set_operations() {
        let mut s = Specials::NONE;
        assert!(s.is_empty());
        s.insert(Specials::RIVER | Specials::HUT);
        assert!(s.contains(Specials::RIVER));
        assert!(s.contains(Specials::HUT));
        assert!(!s.contains(Specials::RESOURCE));
        s.remove(Specials::RIVER);
        assert!(!s.contains(Specials::RIVER));
        assert_eq!(s, Specials::HUT);
        assert!(!s.contains(Specials::NONE));
    }
}

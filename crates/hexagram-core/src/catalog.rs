//! The 64-card hexagram catalog.
//!
//! Each card is one of the I Ching hexagrams and carries exactly two
//! elements: the upper trigram first, the lower trigram second. Cards are
//! referred to everywhere else by [`CardId`], a compact index into
//! [`CATALOG`] that serializes as the card's catalog key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use Element::{Earth, Fire, Lake, Mountain, Sky, Thunder, Water, Wind};

/// Number of cards in the catalog
pub const CATALOG_SIZE: usize = 64;

/// The eight trigram elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Sky,
    Earth,
    Thunder,
    Water,
    Mountain,
    Wind,
    Fire,
    Lake,
}

impl Element {
    /// All elements in trigram order
    pub const ALL: [Element; 8] = [Sky, Earth, Thunder, Water, Mountain, Wind, Fire, Lake];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sky => "sky",
            Earth => "earth",
            Thunder => "thunder",
            Water => "water",
            Mountain => "mountain",
            Wind => "wind",
            Fire => "fire",
            Lake => "lake",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Card {
    /// Catalog key, e.g. `water_sky_xu`
    pub key: &'static str,
    /// Hexagram name
    pub name: &'static str,
    /// Upper and lower trigram elements
    pub elements: [Element; 2],
}

const fn card(key: &'static str, name: &'static str, upper: Element, lower: Element) -> Card {
    Card {
        key,
        name,
        elements: [upper, lower],
    }
}

/// All 64 hexagram cards in King Wen order
pub static CATALOG: [Card; CATALOG_SIZE] = [
    card("sky_sky_qian", "乾", Sky, Sky),
    card("earth_earth_kun", "坤", Earth, Earth),
    card("water_thunder_zhun", "屯", Water, Thunder),
    card("mountain_water_meng", "蒙", Mountain, Water),
    card("water_sky_xu", "需", Water, Sky),
    card("sky_water_song", "讼", Sky, Water),
    card("earth_water_shi", "师", Earth, Water),
    card("water_earth_bi", "比", Water, Earth),
    card("wind_sky_xiaoxu", "小畜", Wind, Sky),
    card("sky_lake_lv", "履", Sky, Lake),
    card("earth_sky_tai", "泰", Earth, Sky),
    card("sky_earth_pi", "否", Sky, Earth),
    card("sky_fire_tongren", "同人", Sky, Fire),
    card("fire_sky_dayou", "大有", Fire, Sky),
    card("earth_mountain_qian", "谦", Earth, Mountain),
    card("thunder_earth_yu", "豫", Thunder, Earth),
    card("lake_thunder_sui", "随", Lake, Thunder),
    card("mountain_wind_gu", "蛊", Mountain, Wind),
    card("earth_lake_lin", "临", Earth, Lake),
    card("wind_earth_guan", "观", Wind, Earth),
    card("fire_thunder_shike", "噬嗑", Fire, Thunder),
    card("mountain_fire_bi", "贲", Mountain, Fire),
    card("mountain_earth_bo", "剥", Mountain, Earth),
    card("earth_thunder_fu", "复", Earth, Thunder),
    card("sky_thunder_wuwang", "无妄", Sky, Thunder),
    card("mountain_sky_daxu", "大畜", Mountain, Sky),
    card("mountain_thunder_yi", "颐", Mountain, Thunder),
    card("lake_wind_daguo", "大过", Lake, Wind),
    card("water_water_kan", "坎", Water, Water),
    card("fire_fire_li", "离", Fire, Fire),
    card("lake_mountain_xian", "咸", Lake, Mountain),
    card("thunder_wind_heng", "恒", Thunder, Wind),
    card("sky_mountain_dun", "遁", Sky, Mountain),
    card("thunder_sky_dazhuang", "大壮", Thunder, Sky),
    card("fire_earth_jin", "晋", Fire, Earth),
    card("earth_fire_mingyi", "明夷", Earth, Fire),
    card("wind_fire_jiaren", "家人", Wind, Fire),
    card("fire_lake_kui", "睽", Fire, Lake),
    card("water_mountain_jian", "蹇", Water, Mountain),
    card("thunder_water_jie", "解", Thunder, Water),
    card("mountain_lake_sun", "损", Mountain, Lake),
    card("wind_thunder_yi", "益", Wind, Thunder),
    card("lake_sky_guai", "夬", Lake, Sky),
    card("sky_wind_gou", "姤", Sky, Wind),
    card("lake_earth_cui", "萃", Lake, Earth),
    card("earth_wind_sheng", "升", Earth, Wind),
    card("lake_water_kun", "困", Lake, Water),
    card("water_wind_jing", "井", Water, Wind),
    card("lake_fire_ge", "革", Lake, Fire),
    card("fire_wind_ding", "鼎", Fire, Wind),
    card("thunder_thunder_zhen", "震", Thunder, Thunder),
    card("mountain_mountain_gen", "艮", Mountain, Mountain),
    card("wind_mountain_jian", "渐", Wind, Mountain),
    card("thunder_lake_guimei", "归妹", Thunder, Lake),
    card("thunder_fire_feng", "丰", Thunder, Fire),
    card("fire_mountain_lv", "旅", Fire, Mountain),
    card("wind_wind_xun", "巽", Wind, Wind),
    card("lake_lake_dui", "兑", Lake, Lake),
    card("wind_water_huan", "涣", Wind, Water),
    card("water_lake_jie", "节", Water, Lake),
    card("wind_lake_zhongfu", "中孚", Wind, Lake),
    card("thunder_mountain_xiaoguo", "小过", Thunder, Mountain),
    card("water_fire_jiji", "既济", Water, Fire),
    card("fire_water_weiji", "未济", Fire, Water),
];

/// A catalog key that names no card
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Unknown card: {0}")]
pub struct UnknownCard(pub String);

/// Index of a card in [`CATALOG`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CardId(u8);

impl CardId {
    /// Look up a card by its catalog key
    pub fn from_key(key: &str) -> Option<CardId> {
        CATALOG
            .iter()
            .position(|card| card.key == key)
            .map(|index| CardId(index as u8))
    }

    /// Card at a catalog position
    pub fn from_index(index: usize) -> Option<CardId> {
        (index < CATALOG_SIZE).then(|| CardId(index as u8))
    }

    /// Every card id in catalog order
    pub fn all() -> impl Iterator<Item = CardId> {
        (0..CATALOG_SIZE as u8).map(CardId)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn card(self) -> &'static Card {
        &CATALOG[self.index()]
    }

    pub fn key(self) -> &'static str {
        self.card().key
    }

    pub fn elements(self) -> [Element; 2] {
        self.card().elements
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CardId {
    type Err = UnknownCard;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CardId::from_key(s).ok_or_else(|| UnknownCard(s.to_string()))
    }
}

impl TryFrom<String> for CardId {
    type Error = UnknownCard;

    fn try_from(key: String) -> Result<Self, Self::Error> {
        key.parse()
    }
}

impl From<CardId> for String {
    fn from(id: CardId) -> String {
        id.key().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_keys_are_unique() {
        let keys: HashSet<_> = CATALOG.iter().map(|c| c.key).collect();
        assert_eq!(keys.len(), CATALOG_SIZE);
    }

    #[test]
    fn test_every_element_pair_appears_once() {
        let pairs: HashSet<_> = CATALOG.iter().map(|c| c.elements).collect();
        assert_eq!(pairs.len(), CATALOG_SIZE);
    }

    #[test]
    fn test_key_prefix_matches_elements() {
        for card in CATALOG.iter() {
            let mut parts = card.key.split('_');
            assert_eq!(parts.next(), Some(card.elements[0].as_str()), "{}", card.key);
            assert_eq!(parts.next(), Some(card.elements[1].as_str()), "{}", card.key);
        }
    }

    #[test]
    fn test_card_id_lookup() {
        let id = CardId::from_key("water_sky_xu").unwrap();
        assert_eq!(id.elements(), [Water, Sky]);
        assert_eq!(id.to_string(), "water_sky_xu");
        assert!(CardId::from_key("not_a_card").is_none());
        assert!(CardId::from_index(CATALOG_SIZE).is_none());
    }

    #[test]
    fn test_card_id_serializes_as_key() {
        let id: CardId = "sky_sky_qian".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sky_sky_qian\"");
        let back: CardId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<CardId>("\"bogus\"").is_err());
    }
}

use crate::utils::error::{EhonError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// 47 都道府県，順序為 JIS 都道府県コード
pub static PREFECTURES: [&str; 47] = [
    "北海道", "青森県", "岩手県", "宮城県", "秋田県", "山形県", "福島県",
    "茨城県", "栃木県", "群馬県", "埼玉県", "千葉県", "東京都", "神奈川県",
    "新潟県", "富山県", "石川県", "福井県", "山梨県", "長野県",
    "岐阜県", "静岡県", "愛知県", "三重県",
    "滋賀県", "京都府", "大阪府", "兵庫県", "奈良県", "和歌山県",
    "鳥取県", "島根県", "岡山県", "広島県", "山口県",
    "徳島県", "香川県", "愛媛県", "高知県",
    "福岡県", "佐賀県", "長崎県", "熊本県", "大分県", "宮崎県", "鹿児島県", "沖縄県",
];

/// 圖書館查詢的地區範圍（都道府県）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Region(&'static str);

impl Region {
    /// 接受完整名稱，或省略「都/道/府/県」的寫法（例如「東京」）
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        PREFECTURES
            .iter()
            .copied()
            .find(|pref| {
                *pref == name
                    || pref
                        .strip_suffix(['都', '道', '府', '県'])
                        .is_some_and(|short| short == name)
            })
            .map(Region)
            .ok_or_else(|| EhonError::UnknownRegion {
                name: name.to_string(),
            })
    }

    pub fn name(&self) -> &'static str {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Region> {
        PREFECTURES.iter().copied().map(Region)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Region::parse(&name).map_err(serde::de::Error::custom)
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.0.to_string()
    }
}

// 📈 Chart Data Builder - bar chart payload for an entity

use crate::aggregator::CensusStore;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarChart {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub series: Vec<ChartPoint>,
}

/// One bar labelled with the entity name; None for an unknown entity
pub fn build_bar_chart(store: &CensusStore, entity: &str) -> Option<BarChart> {
    let total = store.total_population(entity)?;

    Some(BarChart {
        chart_type: ChartType::Bar,
        series: vec![ChartPoint {
            label: entity.to_string(),
            value: total,
        }],
    })
}

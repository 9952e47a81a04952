use chrono::Duration;
use proptest::prelude::*;
use timeseries_collection::utils::parse_timestamp;
use timeseries_collection::{
    Dataset, DateTimeIndex, Error, Frequency, Series, TimeIndex, TimeSeriesCollection, Timestamp,
};

fn start() -> Timestamp {
    parse_timestamp("2015-04-09").unwrap()
}

fn daily(count: i64) -> DateTimeIndex {
    DateTimeIndex::uniform(start(), count, Frequency::days(1).unwrap()).unwrap()
}

fn range(a: i32, b: i32) -> Vec<f64> {
    (a..b).map(f64::from).collect()
}

#[test]
fn slice_scenario() {
    let series = vec![
        Series::new("0.0", range(0, 10)),
        Series::new("10.0", range(10, 20)),
        Series::new("20.0", range(20, 30)),
    ];
    let coll = TimeSeriesCollection::new(daily(10), Dataset::parallelize(series, 3)).unwrap();
    let sliced = coll.slice(start() + Duration::days(1), start() + Duration::days(6));

    assert_eq!(
        sliced.index(),
        &DateTimeIndex::uniform(start() + Duration::days(1), 6, Frequency::days(1).unwrap()).unwrap()
    );
    let map = sliced.collect_as_map();
    assert_eq!(map["0.0"], range(1, 7));
    assert_eq!(map["10.0"], range(11, 17));
    assert_eq!(map["20.0"], range(21, 27));
}

#[test]
fn nan_removal_scenario() {
    let series = vec![
        Series::new("1.0", range(1, 5)),
        Series::new("5.0", vec![5.0, f64::NAN, 7.0, 8.0]),
        Series::new("9.0", vec![9.0, 10.0, 11.0, f64::NAN]),
    ];
    let coll = TimeSeriesCollection::new(daily(4), Dataset::parallelize(series, 2)).unwrap();
    let cleaned = coll.remove_instants_with_nans();

    assert_eq!(
        cleaned.index(),
        &DateTimeIndex::irregular([start(), start() + Duration::days(2)]).unwrap()
    );
    let map = cleaned.collect_as_map();
    assert_eq!(map["1.0"], vec![1.0, 3.0]);
    assert_eq!(map["5.0"], vec![5.0, 7.0]);
    assert_eq!(map["9.0"], vec![9.0, 11.0]);
}

#[test]
fn evenly_spaced_survivors_stay_uniform() {
    let series = vec![Series::new("x", vec![0.0, f64::NAN, 2.0, f64::NAN, 4.0])];
    let coll = TimeSeriesCollection::new(daily(5), Dataset::parallelize(series, 1)).unwrap();
    let cleaned = coll.remove_instants_with_nans();
    assert!(cleaned.index().is_uniform());
    assert_eq!(
        cleaned.index(),
        &DateTimeIndex::uniform(start(), 3, Frequency::days(2).unwrap()).unwrap()
    );
    assert_eq!(cleaned.find_series("x"), Some(vec![0.0, 2.0, 4.0]));
}

#[test]
fn filter_ending_after_scenario() {
    let series = vec![
        Series::new("a", range(0, 10)),
        Series::new("b", range(0, 10)),
        Series::new("c", range(0, 10)),
    ];
    let coll = TimeSeriesCollection::new(daily(10), Dataset::parallelize(series, 2)).unwrap();
    assert_eq!(coll.filter_ending_after(start()).count(), 3);
    assert_eq!(coll.filter_ending_after(start() + Duration::days(9)).count(), 0);
}

#[test]
fn business_day_collection_skips_weekends() {
    // Thursday through the following Wednesday.
    let index = DateTimeIndex::uniform(start(), 5, Frequency::business_days(1).unwrap()).unwrap();
    let coll = TimeSeriesCollection::new(
        index,
        Dataset::parallelize(vec![Series::new("x", range(0, 5))], 1),
    )
    .unwrap();
    let sliced = coll.slice(
        parse_timestamp("2015-04-11").unwrap(),
        parse_timestamp("2015-04-14").unwrap(),
    );
    assert_eq!(sliced.index().first(), Some(parse_timestamp("2015-04-13").unwrap()));
    assert_eq!(sliced.find_series("x"), Some(vec![2.0, 3.0]));
}

#[test]
fn save_then_load_keeps_everything() {
    let series = vec![
        Series::new("a", vec![0.1, f64::NAN, 1e300]),
        Series::new("b", vec![-0.0, f64::INFINITY, 2.0]),
    ];
    let coll = TimeSeriesCollection::new(daily(3), Dataset::parallelize(series, 2)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    coll.save(dir.path()).unwrap();
    assert!(matches!(coll.save(dir.path()), Err(Error::AlreadyExists(_))));

    let back = TimeSeriesCollection::load(dir.path()).unwrap();
    assert_eq!(back.index(), coll.index());
    assert_eq!(back.keys(), coll.keys());
    for (x, y) in back.collect().iter().zip(coll.collect()) {
        let bits = |s: &Series| s.values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(x), bits(&y));
    }
}

fn collection_strategy() -> impl Strategy<Value = (TimeSeriesCollection, usize)> {
    (1i64..12, 1usize..6, 1usize..5).prop_flat_map(|(len, keys, partitions)| {
        let value = prop_oneof![4 => -1e6f64..1e6, 1 => Just(f64::NAN)];
        proptest::collection::vec(proptest::collection::vec(value, len as usize), keys).prop_map(
            move |rows| {
                let series = rows
                    .into_iter()
                    .enumerate()
                    .map(|(k, values)| Series::new(format!("k{k:02}"), values))
                    .collect();
                let coll =
                    TimeSeriesCollection::new(daily(len), Dataset::parallelize(series, partitions))
                        .unwrap();
                (coll, partitions)
            },
        )
    })
}

proptest! {
    #[test]
    fn observations_round_trip((coll, _) in collection_strategy()) {
        let table = coll.to_observations_table("t", "k", "v");
        let back = TimeSeriesCollection::from_observations_table(
            coll.index().clone(), &table, "t", "k", "v",
        ).unwrap();
        prop_assert_eq!(back.index(), coll.index());
        let original = coll.collect_as_map();
        let rebuilt = back.collect_as_map();
        prop_assert_eq!(original.len(), rebuilt.len());
        for (key, values) in &original {
            let other = &rebuilt[key];
            for (x, y) in values.iter().zip(other) {
                prop_assert_eq!(x.to_bits(), y.to_bits());
            }
        }
    }

    #[test]
    fn instants_shape_and_nan_free_cleanup((coll, _) in collection_strategy()) {
        let instants = coll.to_instants().collect();
        prop_assert_eq!(instants.len(), coll.index().size());
        prop_assert!(instants.iter().all(|i| i.values.len() == coll.count()));

        let cleaned = coll.remove_instants_with_nans();
        let size = cleaned.index().size();
        for series in cleaned.collect() {
            prop_assert_eq!(series.values.len(), size);
            prop_assert!(series.values.iter().all(|v| !v.is_nan()));
        }
    }

    #[test]
    fn instants_do_not_depend_on_partitioning((coll, partitions) in collection_strategy()) {
        let single = TimeSeriesCollection::new(
            coll.index().clone(),
            Dataset::parallelize(coll.collect(), 1),
        ).unwrap();
        let spread = TimeSeriesCollection::new(
            coll.index().clone(),
            Dataset::parallelize(coll.collect(), partitions + 3),
        ).unwrap();
        let bits = |c: &TimeSeriesCollection| {
            c.to_row_matrix()
                .into_rows()
                .collect()
                .into_iter()
                .map(|row| row.iter().map(|v| v.to_bits()).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(bits(&single), bits(&spread));
    }
}

#[test]
fn observation_files_to_instants_csv() {
    use timeseries_collection::{Cell, ColumnType, Table};

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("obs.csv");
    std::fs::write(
        &input,
        "key,timestamp,value\nb,2015-04-10,2\na,2015-04-09,1\na,2015-04-10,NaN\n",
    )
    .unwrap();
    let column_type = |name: &str| match name {
        "timestamp" => ColumnType::Timestamp,
        "value" => ColumnType::Float,
        _ => ColumnType::Text,
    };
    let observations = Table::read_csv_by_name(&input, column_type)
        .unwrap()
        .to_observations("timestamp", "key", "value")
        .unwrap();
    let coll = TimeSeriesCollection::from_observations(daily(2), &observations).unwrap();

    let output = dir.path().join("instants.csv");
    coll.to_instants_table().write_csv(&output).unwrap();
    let back = Table::read_csv(
        &output,
        &[ColumnType::Timestamp, ColumnType::Float, ColumnType::Float],
    )
    .unwrap();
    assert_eq!(back.columns(), ["instant", "a", "b"]);
    let rows = back.into_rows().collect();
    assert_eq!(rows[0][0], Cell::Timestamp(start()));
    assert_eq!(rows[0][1], Cell::Float(1.0));
    assert!(matches!(rows[0][2], Cell::Float(v) if v.is_nan()));
    assert!(matches!(rows[1][1], Cell::Float(v) if v.is_nan()));
    assert_eq!(rows[1][2], Cell::Float(2.0));

    let missing = Table::read_csv_by_name(&input, column_type)
        .unwrap()
        .to_observations("when", "key", "value");
    assert!(matches!(missing, Err(Error::MissingColumn(_))));
}

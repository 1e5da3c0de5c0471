use std::collections::{HashMap, HashSet};

use parquet2::metadata::SchemaDescriptor;
use parquet2::schema::types::{PhysicalType, PrimitiveLogicalType, PrimitiveType};
use zeroshot_datasets::hub::{config_and_split, HubDataset};

fn dtype_of(dtype: &PrimitiveType) -> String {
    match (dtype.logical_type, dtype.physical_type) {
        (Some(PrimitiveLogicalType::String), _) => "String".to_string(),
        (_, PhysicalType::Boolean) => "bool".to_string(),
        (_, PhysicalType::Int32) => "i32".to_string(),
        (_, PhysicalType::Int64) => "i64".to_string(),
        (_, PhysicalType::Float) => "f32".to_string(),
        (_, PhysicalType::Double) => "f64".to_string(),
        (_, PhysicalType::ByteArray) => "bytes".to_string(),
        dt => panic!("Unhandled: {dt:?}"),
    }
}

fn columns_string(schema: &SchemaDescriptor) -> String {
    let mut string = String::new();
    for column in schema.columns() {
        let name = &column.descriptor.primitive_type.field_info.name;
        let dtype = dtype_of(&column.descriptor.primitive_type);
        string.push_str(&format!("    {name}: {dtype}\n"));
    }
    string
}

fn main() {
    let id = std::env::args()
        .nth(1)
        .expect("Give a specific dataset_id, choose from https://huggingface.co/datasets");
    let dataset = HubDataset::from_id(id).unwrap();

    let remote_files = dataset.remote_files().unwrap();
    let mut configs = HashMap::new();

    for remote_file in &remote_files {
        let Some((config, split_name)) = config_and_split(remote_file) else {
            continue;
        };
        let metadata = dataset.parquet_metadata(remote_file).unwrap();
        let columns = columns_string(metadata.schema());
        configs
            .entry((config, split_name))
            .or_insert(HashSet::new())
            .insert((columns, metadata.num_rows, remote_file));
    }
    for ((config, split_name), set) in configs {
        println!();
        println!("--{config}/{split_name}--");
        for (columns, num_rows, remote_file) in set {
            print!("{columns}");
            println!("Filename: {remote_file}");
            println!("Count: {num_rows}");
        }
    }
}

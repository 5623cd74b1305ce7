use csv::Writer;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

pub fn write_records(output: &Path, records: Vec<impl Serialize>) -> csv::Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = Writer::from_path(output)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Splits a script into statements on `;`, dropping `--` comment lines and empty statements.
pub fn split_statements(script: &str) -> Vec<String> {
    let script: String = script
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    script
        .split(';')
        .map(|stmt| stmt.trim())
        .filter(|stmt| !stmt.is_empty())
        .map(|stmt| stmt.to_string())
        .collect()
}

pub fn read_queries(path: &Path) -> io::Result<Vec<String>> {
    Ok(split_statements(&fs::read_to_string(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_statements() {
        let script = "-- first query\n\
                      select * from orders;\n\
                      \n\
                      select * from customers\n\
                      where id = 1;\n\
                      ;";
        assert_eq!(
            split_statements(script),
            vec!["select * from orders", "select * from customers\nwhere id = 1"]
        );
    }

    #[test]
    fn test_write_records() {
        #[derive(Serialize)]
        struct Record {
            query_num: usize,
            plan: String,
        }

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("stats.csv");
        write_records(
            &output,
            vec![Record {
                query_num: 1,
                plan: "Hash Join".to_string(),
            }],
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "query_num,plan\n1,Hash Join\n"
        );
    }

    #[test]
    fn test_read_queries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.sql");
        fs::write(&path, "select * from a; select * from b;").unwrap();
        assert_eq!(read_queries(&path).unwrap().len(), 2);
    }
}

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use mapsift_crawler::TabularStore;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::a1::{column_letter, row_range, sheet_range};

pub const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: usize,
    #[serde(default)]
    column_count: usize,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Google Sheets v4 over REST, authenticated with an OAuth bearer token.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: Client,
    token: String,
    base_url: String,
}

impl SheetsClient {
    pub fn new(token: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Couldn't build HTTP client")?;
        Ok(Self {
            http,
            token: token.into(),
            base_url: SHEETS_API.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid base URL {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> anyhow::Result<T> {
        let resp = request.bearer_auth(&self.token).send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("Sheets API answered {status}: {body}");
        }
        Ok(resp.json()?)
    }

    fn sheets(&self, spreadsheet_id: &str) -> anyhow::Result<Vec<SheetProperties>> {
        let url = self.url(&[spreadsheet_id])?;
        let spreadsheet: Spreadsheet = self.send(
            self.http
                .get(url)
                .query(&[("fields", "sheets.properties")]),
        )?;
        Ok(spreadsheet.sheets.into_iter().map(|s| s.properties).collect())
    }

    fn sheet(&self, spreadsheet_id: &str, title: &str) -> anyhow::Result<Option<SheetProperties>> {
        Ok(self
            .sheets(spreadsheet_id)?
            .into_iter()
            .find(|p| p.title == title))
    }

    fn batch_update(&self, spreadsheet_id: &str, requests: Value) -> anyhow::Result<Value> {
        let url = self.url(&[&format!("{spreadsheet_id}:batchUpdate")])?;
        self.send(self.http.post(url).json(&json!({ "requests": requests })))
    }

    fn get_values(&self, spreadsheet_id: &str, range: &str) -> anyhow::Result<Vec<Vec<String>>> {
        let url = self.url(&[spreadsheet_id, "values", range])?;
        let values: ValueRange = self.send(self.http.get(url))?;
        Ok(values.values)
    }

    fn put_rows(&self, spreadsheet_id: &str, range: &str, rows: &[&[String]]) -> anyhow::Result<()> {
        let url = self.url(&[spreadsheet_id, "values:batchUpdate"])?;
        let body = json!({
            "valueInputOption": "RAW",
            "data": [{ "range": range, "values": rows }],
        });
        let _: Value = self.send(self.http.post(url).json(&body))?;
        Ok(())
    }
}

impl TabularStore for SheetsClient {
    fn create_spreadsheet(&mut self, title: &str) -> anyhow::Result<String> {
        let url = self.url(&[])?;
        let created: Value = self.send(
            self.http
                .post(url)
                .query(&[("fields", "spreadsheetId")])
                .json(&json!({ "properties": { "title": title } })),
        )?;
        let id = created["spreadsheetId"]
            .as_str()
            .ok_or_else(|| anyhow!("No spreadsheet id in {created}"))?;
        log::info!("Created spreadsheet {title:?} ({id})");
        Ok(id.to_string())
    }

    fn create_sheet(&mut self, spreadsheet_id: &str, title: &str) -> anyhow::Result<i64> {
        if let Some(existing) = self.sheet(spreadsheet_id, title)? {
            log::info!("Sheet {title:?} already exists ({})", existing.sheet_id);
            return Ok(existing.sheet_id);
        }
        let reply = self.batch_update(
            spreadsheet_id,
            json!([{ "addSheet": { "properties": { "title": title } } }]),
        )?;
        reply["replies"][0]["addSheet"]["properties"]["sheetId"]
            .as_i64()
            .ok_or_else(|| anyhow!("No sheet id in {reply}"))
    }

    fn increase_row_capacity(
        &mut self,
        spreadsheet_id: &str,
        title: &str,
        row_count: usize,
    ) -> anyhow::Result<()> {
        let sheet = self
            .sheet(spreadsheet_id, title)?
            .ok_or_else(|| anyhow!("Sheet {title:?} not found"))?;
        if sheet.grid_properties.row_count >= row_count {
            return Ok(());
        }
        self.batch_update(
            spreadsheet_id,
            json!([{
                "updateSheetProperties": {
                    "properties": {
                        "sheetId": sheet.sheet_id,
                        "gridProperties": { "rowCount": row_count },
                    },
                    "fields": "gridProperties.rowCount",
                }
            }]),
        )?;
        log::info!("Sheet {title:?} grown to {row_count} rows");
        Ok(())
    }

    fn write_headers(
        &mut self,
        headers: &[String],
        spreadsheet_id: &str,
        title: &str,
    ) -> anyhow::Result<()> {
        let range = sheet_range(title, &row_range(1, headers.len()));
        self.put_rows(spreadsheet_id, &range, &[headers])
    }

    fn append_row(
        &mut self,
        headers: &[String],
        row: &[String],
        spreadsheet_id: &str,
        title: &str,
    ) -> anyhow::Result<()> {
        let width = headers.len().max(row.len());
        let columns = sheet_range(title, &format!("A:{}", column_letter(width)));
        let used = self.get_values(spreadsheet_id, &columns)?.len();
        let mut next = used + 1;
        if used == 0 {
            self.write_headers(headers, spreadsheet_id, title)?;
            next += 1;
        }
        let range = sheet_range(title, &row_range(next, width));
        log::debug!("Writing row {next} of {title:?}");
        self.put_rows(spreadsheet_id, &range, &[row])
    }

    fn read_values(
        &mut self,
        spreadsheet_id: &str,
        title: &str,
        range: Option<&str>,
    ) -> anyhow::Result<Vec<Vec<String>>> {
        let range = match range {
            Some(range) => sheet_range(title, range),
            None => {
                let sheet = self
                    .sheet(spreadsheet_id, title)?
                    .ok_or_else(|| anyhow!("Sheet {title:?} not found"))?;
                let grid = sheet.grid_properties;
                sheet_range(
                    title,
                    &format!(
                        "A1:{}{}",
                        column_letter(grid.column_count.max(1)),
                        grid.row_count.max(1)
                    ),
                )
            }
        };
        log::debug!("Reading {range}");
        self.get_values(spreadsheet_id, &range)
    }
}

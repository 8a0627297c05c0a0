//! Plain-text and HTML reports written to the run's output stream.
//!
//! The writer owns all presentation state (alternating row colours, the
//! table currently being compared), so the engine only hands it events.

use std::io::Write;

use crate::compare::{ComparisonCounts, ComparisonSink, RowClassification, RowEvent};
use crate::config::{Operation, RunConfig, ShowRows};
use crate::core::{CursorColumn, Row, TableDescriptor, Value};
use crate::error::Result;
use crate::schema_diff::definition_line;
use crate::transfer::CopyOutcome;

const ABSENT_COLOR: &str = "#FFFFCC";
const HEADER_CELL: &str = "<TD><FONT COLOR=WHITE><B>{}</B></FONT></TD>";

/// Escape text for an HTML cell.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

fn header_cell(title: &str) -> String {
    HEADER_CELL.replace("{}", title)
}

#[derive(Debug)]
struct ComparedTable {
    name: String,
    columns: Vec<CursorColumn>,
}

/// Report output for one run.
pub struct ReportWriter<W: Write> {
    out: W,
    html: bool,
    display: u8,
    limited: bool,
    source_label: String,
    destination_label: String,
    table_color: usize,
    generator_color: usize,
    current: Option<ComparedTable>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W, run: &RunConfig, source_label: &str, destination_label: &str) -> Self {
        Self {
            out,
            html: run.html,
            display: if run.html { run.display_flags() } else { 0 },
            limited: run.limited,
            source_label: source_label.to_string(),
            destination_label: destination_label.to_string(),
            table_color: 0,
            generator_color: 0,
            current: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn next_table_color(&mut self) -> &'static str {
        let color = if self.table_color % 2 == 1 { "#CCCCCC" } else { "silver" };
        self.table_color += 1;
        color
    }

    fn shows(&self, show: ShowRows) -> bool {
        self.display & show.flag() != 0
    }

    fn detail_mode(&self) -> bool {
        self.html && self.display != 0
    }

    fn html_head(&mut self, title: &str) -> Result<()> {
        write!(
            self.out,
            "<HTML>\n<HEAD>\n<TITLE>{}</TITLE>\n</HEAD>\n\
             <BODY>\n<B>Source database:</B> {}<BR><B>Destination database:</B> {}<BR><BR>\
             <STYLE>\nTD {{ font-family: Tahoma, Helvetica; font-size: 9px }}\n</STYLE>\n",
            title,
            escape_html(&self.source_label),
            escape_html(&self.destination_label)
        )?;
        Ok(())
    }

    fn legend_entry(&mut self, color: &str, text: &str) -> Result<()> {
        writeln!(
            self.out,
            "<TR><TD align=right><TABLE BGCOLOR=BLACK BORDER=0 CELLSPACING=1 CELLPADDING=0 width=30 height=10>\
             <TR BGCOLOR={}><TD width=28>&nbsp; </TD></TR></TABLE></TD><TD align=left>{}</TD></TR>",
            color, text
        )?;
        Ok(())
    }

    // -- define / alter -------------------------------------------------

    pub fn begin_schema(&mut self, operation: Operation) -> Result<()> {
        if !self.html {
            return Ok(());
        }
        self.html_head("pgcopy database comparison table")?;
        writeln!(
            self.out,
            "<TABLE BGCOLOR=BLACK BORDER=0 CELLSPACING=1 CELLPADDING=4 width=100%>\n<TR>"
        )?;
        writeln!(self.out, "{}", header_cell("Table"))?;
        writeln!(self.out, "{}", header_cell("Mutual columns"))?;
        if operation == Operation::Alter {
            writeln!(
                self.out,
                "<TD colspan=2><FONT COLOR=WHITE><B>Missing tables and columns</B></FONT></TD>"
            )?;
        } else {
            writeln!(self.out, "{}", header_cell("Missing in destination"))?;
            writeln!(self.out, "{}", header_cell("Missing in source"))?;
        }
        writeln!(self.out, "</TR>")?;
        Ok(())
    }

    fn table_row_color(&mut self, table: &TableDescriptor) -> &'static str {
        if table.absent_on_destination() {
            ABSENT_COLOR
        } else {
            self.next_table_color()
        }
    }

    /// One define-mode record.
    pub fn table_definition(&mut self, table: &TableDescriptor) -> Result<()> {
        if !self.html {
            writeln!(self.out, "{}", definition_line(table))?;
            return Ok(());
        }
        let color = self.table_row_color(table);
        let join = |set: &std::collections::BTreeSet<String>| {
            escape_html(&set.iter().cloned().collect::<Vec<_>>().join(", "))
        };
        writeln!(
            self.out,
            "<TR BGCOLOR={}><TD>{}</TD><TD>{}</TD><TD>{}</TD><TD>{}</TD></TR>",
            color,
            escape_html(&table.name),
            join(&table.common),
            join(&table.missing),
            join(&table.extra)
        )?;
        Ok(())
    }

    /// DDL for one table in alter mode.
    pub fn table_alteration(&mut self, table: &TableDescriptor, ddl: &str) -> Result<()> {
        if !self.html {
            writeln!(self.out, "{}\n", ddl)?;
            return Ok(());
        }
        let color = self.table_row_color(table);
        writeln!(
            self.out,
            "<TR BGCOLOR={}><TD>{}</TD><TD>{}</TD><TD COLSPAN=2>{}</TD></TR>",
            color,
            escape_html(&table.name),
            escape_html(&table.columns().join(", ")),
            escape_html(ddl).replace('\n', "<BR>")
        )?;
        Ok(())
    }

    /// A source generator and whether the destination has one of the same name.
    pub fn generator_definition(
        &mut self,
        operation: Operation,
        generator: &str,
        destination: Option<&str>,
    ) -> Result<()> {
        if self.html {
            let color = if destination.is_some() {
                let c = if self.generator_color % 2 == 1 { "#CCCCFF" } else { "#DDDDFF" };
                self.generator_color += 1;
                c
            } else {
                ABSENT_COLOR
            };
            writeln!(
                self.out,
                "<TR BGCOLOR={}><TD COLSPAN=4>{}</TD></TR>",
                color,
                escape_html(generator)
            )?;
        } else if operation == Operation::Define {
            writeln!(self.out, "{}", crate::schema_diff::generator_line(generator, destination))?;
        }
        Ok(())
    }

    pub fn end_schema(&mut self, tables: usize, generators: usize) -> Result<()> {
        if !self.html {
            return Ok(());
        }
        writeln!(
            self.out,
            "<TR><TD COLSPAN=4><FONT COLOR=WHITE><B>Inspected {} tables and {} generators in source database.</B></FONT></TD></TR>",
            tables, generators
        )?;
        writeln!(self.out, "</TABLE>\n<BR>\n<TABLE WIDTH=99% BORDER=0 CELLSPACING=1 CELLPADDING=2>")?;
        self.legend_entry(
            ABSENT_COLOR,
            "This color represents the objects not found in destination database.",
        )?;
        writeln!(self.out, "</TABLE>\n<BR></BODY>\n</HTML>")?;
        self.out.flush()?;
        Ok(())
    }

    // -- copy -------------------------------------------------------------

    pub fn copy_started(&mut self, table: &str) -> Result<()> {
        writeln!(self.out, "Copying table: {}", table)?;
        self.out.flush()?;
        Ok(())
    }

    pub fn copy_finished(&mut self, outcome: &CopyOutcome) -> Result<()> {
        writeln!(self.out, "{}", outcome.summary_line())?;
        Ok(())
    }

    pub fn no_common_fields(&mut self, table: &str) -> Result<()> {
        writeln!(self.out, "No common fields found for table: {}", table)?;
        Ok(())
    }

    pub fn generator_copied(&mut self, source: &str, destination: &str, value: i64) -> Result<()> {
        writeln!(self.out, "Generator {:<32} -> {:<32} = {}.", source, destination, value)?;
        Ok(())
    }

    /// Statements that have to be run by hand to re-enable triggers.
    pub fn trigger_recovery(&mut self, statements: &[String]) -> Result<()> {
        writeln!(
            self.out,
            "Triggers could not get enabled! Please run the following statements manually:"
        )?;
        for statement in statements {
            writeln!(self.out, "{};", statement)?;
        }
        self.out.flush()?;
        Ok(())
    }

    // -- compare ----------------------------------------------------------

    pub fn begin_compare(&mut self) -> Result<()> {
        if !self.html {
            writeln!(
                self.out,
                "{:<32}{:>9}{:>9}{:>9}{:>9}",
                "TABLE NAME", "SAME", "DIFFER", "MISSING", "EXTRA"
            )?;
            writeln!(
                self.out,
                "-------------------------------- -------- -------- -------- --------"
            )?;
            return Ok(());
        }
        self.html_head("pgcopy data comparison table")?;
        if !self.detail_mode() {
            writeln!(
                self.out,
                "<TABLE BGCOLOR=BLACK BORDER=0 CELLSPACING=1 CELLPADDING=4>\n<TR>"
            )?;
            for title in ["Table", "Same rows", "Different rows", "Missing rows", "Extra rows"] {
                writeln!(self.out, "{}", header_cell(title))?;
            }
            writeln!(self.out, "</TR>")?;
        }
        Ok(())
    }

    /// A table that cannot be compared. Text reports leave this to the log.
    pub fn table_skipped(&mut self, table: &str, reason: &str) -> Result<()> {
        if !self.html {
            return Ok(());
        }
        if self.detail_mode() {
            writeln!(
                self.out,
                "<TABLE id=\"{}\" border=0 bgcolor=black cellspacing=1 cellpadding=3>",
                escape_html(table)
            )?;
        }
        writeln!(
            self.out,
            "<TR bgcolor=#FFBBBB><TD COLSPAN=5>Table {}: {}. Skipping.</TD></TR>",
            escape_html(table),
            escape_html(reason)
        )?;
        if self.detail_mode() {
            writeln!(self.out, "</TABLE><BR><BR>")?;
            if self.limited {
                self.hide_table(table)?;
            }
        }
        Ok(())
    }

    fn hide_table(&mut self, table: &str) -> Result<()> {
        writeln!(
            self.out,
            "<STYLE> table#{} : {{display:none}}</STYLE>",
            escape_html(table)
        )?;
        Ok(())
    }

    fn cell_align(column: &CursorColumn) -> &'static str {
        if column.kind.is_numeric() {
            " align=right"
        } else {
            ""
        }
    }

    fn write_row(&mut self, color: &str, row: &Row) -> Result<()> {
        let Some(current) = self.current.as_ref() else {
            return Ok(());
        };
        let mut line = format!("<TR BGCOLOR={}>", color);
        for (column, value) in current.columns.iter().zip(row) {
            line.push_str(&format!(
                "<TD{}>{}</TD>",
                Self::cell_align(column),
                escape_html(&value.to_string())
            ));
        }
        line.push_str("</TR>");
        writeln!(self.out, "{}", line)?;
        Ok(())
    }

    fn write_different(&mut self, source: &Row, destination: &Row) -> Result<()> {
        let Some(current) = self.current.as_ref() else {
            return Ok(());
        };
        let differs = |i: usize| {
            !matches!(
                (source.get(i), destination.get(i)),
                (Some(a), Some(b)) if a.compare(b).is_eq()
            )
        };

        let mut first = String::from("<TR BGCOLOR=#FFFFCC>");
        let mut second = String::from("<TR>");
        for (i, column) in current.columns.iter().enumerate() {
            let align = Self::cell_align(column);
            let text = |row: &Row| escape_html(&row.get(i).unwrap_or(&Value::Null).to_string());
            if differs(i) {
                first.push_str(&format!("<TD bgcolor=#FFFFCC{}>{}</TD>", align, text(source)));
                second.push_str(&format!("<TD bgcolor=#DDDD99{}>{}</TD>", align, text(destination)));
            } else {
                first.push_str(&format!("<TD rowspan=2 bgcolor=#CCFFCC{}>{}</TD>", align, text(source)));
            }
        }
        writeln!(self.out, "{}</TR>\n{}</TR>", first, second)?;
        Ok(())
    }

    /// Close the table opened by [`ComparisonSink::start`].
    pub fn compare_finished(&mut self, counts: &ComparisonCounts) -> Result<()> {
        let current = self.current.take();
        if !self.html {
            writeln!(
                self.out,
                "{:>9}{:>9}{:>9}{:>9}",
                counts.same, counts.different, counts.missing, counts.extra
            )?;
            return Ok(());
        }
        if !self.detail_mode() {
            writeln!(
                self.out,
                "<TD align=right>{}</TD><TD align=right>{}</TD><TD align=right>{}</TD><TD align=right>{}</TD></TR>",
                counts.same, counts.different, counts.missing, counts.extra
            )?;
            return Ok(());
        }

        writeln!(
            self.out,
            "<TR bgcolor=black><TD nowrap><font color=white>Same: {}, Different: {}, Missing: {}, Extra: {}.</font></TD></TR>\n</TABLE>\n<BR><BR>",
            counts.same, counts.different, counts.missing, counts.extra
        )?;
        let displayed = [
            (ShowRows::Missing, RowClassification::Missing),
            (ShowRows::Extra, RowClassification::Extra),
            (ShowRows::Same, RowClassification::Same),
            (ShowRows::Different, RowClassification::Different),
        ]
        .into_iter()
        .any(|(show, class)| self.shows(show) && counts.get(class) > 0);
        if self.limited && !displayed {
            if let Some(current) = current {
                self.hide_table(&current.name)?;
            }
        }
        Ok(())
    }

    /// `<name><source value><destination value>` for one generator.
    pub fn generator_compared(
        &mut self,
        generator: &str,
        source: i64,
        destination: i64,
        classification: RowClassification,
    ) -> Result<()> {
        if !self.html {
            writeln!(self.out, "{:<32}{:>9}{:>9}", generator, source, destination)?;
        } else if !self.detail_mode() {
            let color = if classification == RowClassification::Same {
                "#CCFFCC"
            } else {
                ABSENT_COLOR
            };
            writeln!(
                self.out,
                "<TR BGCOLOR={}><TD>{}</TD><TD COLSPAN=4 align=right>{} / {}</TD></TR>",
                color,
                escape_html(generator),
                source,
                destination
            )?;
        }
        Ok(())
    }

    pub fn end_compare(&mut self) -> Result<()> {
        if self.html {
            if self.detail_mode() {
                writeln!(self.out, "<TABLE WIDTH=99% BORDER=0 CELLSPACING=1 CELLPADDING=2>")?;
                let source = escape_html(&self.source_label);
                let destination = escape_html(&self.destination_label);
                self.legend_entry("#CCFFCC", "Same records.")?;
                self.legend_entry(
                    "#FFFFCC",
                    &format!("Different records, value found in {}.", source),
                )?;
                self.legend_entry(
                    "#DDDD99",
                    &format!("Different records, value found in {}.", destination),
                )?;
                self.legend_entry(
                    "#FFCCCC",
                    &format!("Missing - Records not found in {}.", destination),
                )?;
                self.legend_entry(
                    "#CCCCFF",
                    &format!("Extra - Records not found in {}.", source),
                )?;
            }
            writeln!(self.out, "</TABLE>\n<BR></BODY>\n</HTML>")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> ComparisonSink for ReportWriter<W> {
    fn start(&mut self, table: &TableDescriptor, columns: &[CursorColumn]) -> Result<()> {
        self.current = Some(ComparedTable {
            name: table.name.clone(),
            columns: columns.to_vec(),
        });

        if !self.html {
            write!(self.out, "{:<32}", table.name)?;
            self.out.flush()?;
        } else if self.detail_mode() {
            let name = escape_html(&table.name);
            writeln!(
                self.out,
                "<TABLE id=\"{}\" border=0 bgcolor=black cellspacing=1 cellpadding=3>",
                name
            )?;
            writeln!(
                self.out,
                "<TR><TD colspan={}><font size=+1 color=white><B>{}</B></font></TD></TR>",
                columns.len(),
                name
            )?;
            let mut header = String::from("<tr bgcolor=#666699>");
            for column in columns {
                header.push_str(&format!(
                    "<td nowrap><font color=white>{}</font></td>",
                    escape_html(&column.name)
                ));
            }
            header.push_str("</tr>");
            writeln!(self.out, "{}", header)?;
        } else {
            let color = self.next_table_color();
            write!(
                self.out,
                "<TR BGCOLOR={}><TD>{}</TD>",
                color,
                escape_html(&table.name)
            )?;
        }
        Ok(())
    }

    fn row(&mut self, event: RowEvent<'_>) -> Result<()> {
        if !self.detail_mode() {
            return Ok(());
        }
        match event {
            RowEvent::Missing(row) if self.shows(ShowRows::Missing) => self.write_row("#FFCCCC", row),
            RowEvent::Extra(row) if self.shows(ShowRows::Extra) => self.write_row("#CCCCFF", row),
            RowEvent::Same(row) if self.shows(ShowRows::Same) => self.write_row("#CCFFCC", row),
            RowEvent::Different {
                source,
                destination,
            } if self.shows(ShowRows::Different) => self.write_different(source, destination),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataKind;

    fn writer(run: &RunConfig) -> ReportWriter<Vec<u8>> {
        ReportWriter::new(Vec::new(), run, "sa@src:db1", "sa@dst:db2")
    }

    fn text(w: ReportWriter<Vec<u8>>) -> String {
        String::from_utf8(w.into_inner()).unwrap()
    }

    fn table(name: &str, src: &[&str], dst: &[&str]) -> TableDescriptor {
        TableDescriptor::from_columns(
            name,
            src.iter().map(|s| s.to_string()),
            dst.iter().map(|s| s.to_string()),
        )
        .with_primary_key(vec!["id".into()])
    }

    fn columns() -> Vec<CursorColumn> {
        vec![
            CursorColumn::new("id", DataKind::Int),
            CursorColumn::new("name", DataKind::String),
        ]
    }

    #[test]
    fn test_text_compare_report() {
        let mut w = writer(&RunConfig::default());
        w.begin_compare().unwrap();
        let t = table("people", &["id", "name"], &["id", "name"]);
        w.start(&t, &columns()).unwrap();
        let counts = ComparisonCounts {
            same: 10,
            different: 1,
            missing: 2,
            extra: 0,
        };
        w.compare_finished(&counts).unwrap();
        w.generator_compared("seq", 42, 40, RowClassification::Different).unwrap();
        w.end_compare().unwrap();

        let out = text(w);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], format!("{:<32}{:>9}{:>9}{:>9}{:>9}", "TABLE NAME", "SAME", "DIFFER", "MISSING", "EXTRA"));
        assert_eq!(lines[2], format!("{:<32}{:>9}{:>9}{:>9}{:>9}", "people", 10, 1, 2, 0));
        assert_eq!(lines[3], format!("{:<32}{:>9}{:>9}", "seq", 42, 40));
    }

    #[test]
    fn test_text_define_and_alter() {
        let mut w = writer(&RunConfig::default());
        w.begin_schema(Operation::Define).unwrap();
        w.table_definition(&table("t", &["id", "a"], &["id", "b"])).unwrap();
        w.generator_definition(Operation::Define, "seq", None).unwrap();
        w.generator_definition(Operation::Alter, "seq", None).unwrap();
        w.table_alteration(&table("t", &["id"], &["id"]), "ALTER TABLE \"t\" ADD \"a\" TEXT;")
            .unwrap();
        w.end_schema(1, 1).unwrap();
        assert_eq!(
            text(w),
            "#T:t:\"id\":\"a\":\"b\":\n#G:seq::\nALTER TABLE \"t\" ADD \"a\" TEXT;\n\n"
        );
    }

    #[test]
    fn test_html_define_row_colors() {
        let run = RunConfig {
            html: true,
            ..Default::default()
        };
        let mut w = writer(&run);
        w.begin_schema(Operation::Define).unwrap();
        w.table_definition(&table("a", &["id"], &["id"])).unwrap();
        w.table_definition(&table("b", &["id"], &[])).unwrap();
        w.table_definition(&table("c", &["id"], &["id"])).unwrap();
        w.end_schema(3, 0).unwrap();
        let out = text(w);
        assert!(out.contains("<TR BGCOLOR=silver><TD>a</TD>"));
        assert!(out.contains("<TR BGCOLOR=#FFFFCC><TD>b</TD>"));
        assert!(out.contains("<TR BGCOLOR=#CCCCCC><TD>c</TD>"));
        assert!(out.contains("Inspected 3 tables and 0 generators"));
        assert!(out.trim_end().ends_with("</HTML>"));
    }

    #[test]
    fn test_html_detail_rows() {
        let run = RunConfig {
            html: true,
            show: vec![ShowRows::Different, ShowRows::Missing],
            ..Default::default()
        };
        let mut w = writer(&run);
        w.begin_compare().unwrap();
        let t = table("people", &["id", "name"], &["id", "name"]);
        w.start(&t, &columns()).unwrap();

        let src = vec![Value::Int(1), Value::from("<a>")];
        let dst = vec![Value::Int(1), Value::from("b")];
        w.row(RowEvent::Different {
            source: &src,
            destination: &dst,
        })
        .unwrap();
        w.row(RowEvent::Same(&src)).unwrap();
        let missing = vec![Value::Int(2), Value::Null];
        w.row(RowEvent::Missing(&missing)).unwrap();
        w.compare_finished(&ComparisonCounts {
            same: 1,
            different: 1,
            missing: 1,
            extra: 0,
        })
        .unwrap();
        w.end_compare().unwrap();

        let out = text(w);
        assert!(out.contains("<TABLE id=\"people\""));
        assert!(out.contains("<td nowrap><font color=white>id</font></td><td nowrap><font color=white>name</font></td>"));
        assert!(out.contains(
            "<TR BGCOLOR=#FFFFCC><TD rowspan=2 bgcolor=#CCFFCC align=right>1</TD><TD bgcolor=#FFFFCC>&lt;a&gt;</TD></TR>\n<TR><TD bgcolor=#DDDD99>b</TD></TR>"
        ));
        assert!(!out.contains("<TR BGCOLOR=#CCFFCC><TD align=right>"));
        assert!(out.contains("<TR BGCOLOR=#FFCCCC><TD align=right>2</TD><TD>NULL</TD></TR>"));
        assert!(out.contains("Same: 1, Different: 1, Missing: 1, Extra: 0."));
        assert!(out.contains("Missing - Records not found in sa@dst:db2."));
    }

    #[test]
    fn test_limited_hides_tables_without_displayed_rows() {
        let run = RunConfig {
            html: true,
            limited: true,
            show: vec![ShowRows::Missing],
            ..Default::default()
        };
        let mut w = writer(&run);
        w.begin_compare().unwrap();
        let t = table("people", &["id", "name"], &["id", "name"]);
        w.start(&t, &columns()).unwrap();
        w.compare_finished(&ComparisonCounts {
            same: 5,
            ..Default::default()
        })
        .unwrap();
        w.table_skipped("nokey", "table has no primary key").unwrap();
        let out = text(w);
        assert!(out.contains("<STYLE> table#people : {display:none}</STYLE>"));
        assert!(out.contains("<STYLE> table#nokey : {display:none}</STYLE>"));
    }

    #[test]
    fn test_html_summary_rows_alternate() {
        let run = RunConfig {
            html: true,
            ..Default::default()
        };
        let mut w = writer(&run);
        w.begin_compare().unwrap();
        for name in ["a", "b"] {
            w.start(&table(name, &["id"], &["id"]), &columns()[..1]).unwrap();
            w.compare_finished(&ComparisonCounts::default()).unwrap();
        }
        let out = text(w);
        assert!(out.contains("<TR BGCOLOR=silver><TD>a</TD><TD align=right>0</TD>"));
        assert!(out.contains("<TR BGCOLOR=#CCCCCC><TD>b</TD>"));
    }

    #[test]
    fn test_copy_lines() {
        let mut w = writer(&RunConfig::default());
        w.copy_started("people").unwrap();
        w.copy_finished(&CopyOutcome {
            copied: 2,
            committed: true,
            ..Default::default()
        })
        .unwrap();
        w.generator_copied("a", "b", 7).unwrap();
        assert_eq!(
            text(w),
            format!(
                "Copying table: people\n2 records copied and commited.\nGenerator {:<32} -> {:<32} = 7.\n",
                "a", "b"
            )
        );
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b & \"c\">"), "a&lt;b &amp; &quot;c&quot;&gt;");
    }
}

// src/services/document_service.rs

use genpdf::{elements, style, Alignment, Element};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{accounts::Account, journal::JournalEntryDetail},
    services::{journal_service::JournalService, tenancy_service::TenantService},
};

const FONT_FAMILY: &str = "Roboto";

/// Uma linha da tabela do comprovante
#[derive(Debug, Clone, PartialEq)]
pub struct VoucherRow {
    pub account: String,
    pub description: String,
    pub debit: String,
    pub credit: String,
}

/// Tudo o que vai impresso; montado antes de abrir o PDF.
#[derive(Debug, Clone)]
pub struct VoucherData {
    pub company_name: String,
    pub title: String,
    pub header_lines: Vec<String>,
    pub rows: Vec<VoucherRow>,
    pub total_debit: String,
    pub total_credit: String,
}

fn money(value: Decimal) -> String {
    if value.is_zero() { String::new() } else { format!("{:.2}", value.round_dp(2)) }
}

pub fn build_voucher_data(
    company_name: &str,
    detail: &JournalEntryDetail,
    accounts: &HashMap<Uuid, Account>,
) -> VoucherData {
    let entry = &detail.entry;

    let mut header_lines = vec![
        format!("Data: {}", entry.entry_date.format("%d/%m/%Y")),
        format!("Histórico: {}", entry.description),
    ];
    if let Some(reference) = &entry.reference {
        header_lines.push(format!("Referência: {reference}"));
    }
    header_lines.push(match entry.posted_at {
        Some(at) if entry.is_posted => format!("Situação: EFETIVADO em {}", at.format("%d/%m/%Y %H:%M")),
        _ if entry.is_posted => "Situação: EFETIVADO".to_string(),
        _ => "Situação: RASCUNHO".to_string(),
    });
    if entry.reversal_of.is_some() {
        header_lines.push("Estorno de lançamento anterior".to_string());
    }

    let rows = detail
        .lines
        .iter()
        .map(|line| VoucherRow {
            account: accounts
                .get(&line.account_id)
                .map(|a| format!("{} - {}", a.code, a.name))
                .unwrap_or_else(|| line.account_id.to_string()),
            description: line.description.clone().unwrap_or_default(),
            debit: money(line.debit),
            credit: money(line.credit),
        })
        .collect();

    VoucherData {
        company_name: company_name.to_string(),
        title: format!("LANÇAMENTO CONTÁBIL #{}", entry.entry_number),
        header_lines,
        rows,
        total_debit: format!("{:.2}", detail.total_debit.round_dp(2)),
        total_credit: format!("{:.2}", detail.total_credit.round_dp(2)),
    }
}

fn render_voucher(fonts_dir: &str, data: VoucherData) -> Result<Vec<u8>, AppError> {
    // Carrega a fonte da pasta configurada
    let font_family = genpdf::fonts::from_files(fonts_dir, FONT_FAMILY, None)
        .map_err(|e| AppError::DocumentGeneration(format!("fonte {FONT_FAMILY} em {fonts_dir}: {e}")))?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(data.title.clone());
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // --- CABEÇALHO ---
    doc.push(elements::Paragraph::new(data.company_name).styled(style::Style::new().bold().with_font_size(18)));
    doc.push(elements::Break::new(1.5));
    doc.push(elements::Paragraph::new(data.title).styled(style::Style::new().bold().with_font_size(14)));
    for line in data.header_lines {
        doc.push(elements::Paragraph::new(line));
    }
    doc.push(elements::Break::new(2));

    // --- PARTIDAS ---
    // Pesos das colunas: Conta (4), Histórico (4), Débito (2), Crédito (2)
    let mut table = elements::TableLayout::new(vec![4, 4, 2, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let table_error = |e: genpdf::error::Error| AppError::DocumentGeneration(format!("tabela: {e}"));
    let style_bold = style::Style::new().bold();
    table
        .row()
        .element(elements::Paragraph::new("Conta").styled(style_bold))
        .element(elements::Paragraph::new("Histórico").styled(style_bold))
        .element(elements::Paragraph::new("Débito").styled(style_bold))
        .element(elements::Paragraph::new("Crédito").styled(style_bold))
        .push()
        .map_err(table_error)?;

    for row in data.rows {
        table
            .row()
            .element(elements::Paragraph::new(row.account))
            .element(elements::Paragraph::new(row.description))
            .element(elements::Paragraph::new(row.debit).aligned(Alignment::Right))
            .element(elements::Paragraph::new(row.credit).aligned(Alignment::Right))
            .push()
            .map_err(table_error)?;
    }

    table
        .row()
        .element(elements::Paragraph::new("TOTAIS").styled(style_bold))
        .element(elements::Paragraph::new(""))
        .element(elements::Paragraph::new(data.total_debit).aligned(Alignment::Right).styled(style_bold))
        .element(elements::Paragraph::new(data.total_credit).aligned(Alignment::Right).styled(style_bold))
        .push()
        .map_err(table_error)?;

    doc.push(table);
    doc.push(elements::Break::new(3));

    // --- ASSINATURAS ---
    let mut signatures = elements::TableLayout::new(vec![1, 1]);
    let rule = "______________________________";
    signatures
        .row()
        .element(elements::Paragraph::new(rule).aligned(Alignment::Center))
        .element(elements::Paragraph::new(rule).aligned(Alignment::Center))
        .push()
        .map_err(table_error)?;
    signatures
        .row()
        .element(elements::Paragraph::new("Elaborado por").aligned(Alignment::Center))
        .element(elements::Paragraph::new("Aprovado por").aligned(Alignment::Center))
        .push()
        .map_err(table_error)?;
    doc.push(signatures);

    let mut buffer = Vec::new();
    doc.render(&mut buffer)
        .map_err(|e| AppError::DocumentGeneration(format!("render: {e}")))?;
    Ok(buffer)
}

#[derive(Clone)]
pub struct DocumentService {
    journal_service: JournalService,
    tenant_service: TenantService,
    fonts_dir: String,
}

impl DocumentService {
    pub fn new(journal_service: JournalService, tenant_service: TenantService, fonts_dir: String) -> Self {
        Self { journal_service, tenant_service, fonts_dir }
    }

    /// Comprovante do lançamento em PDF.
    pub async fn entry_voucher_pdf(&self, tenant_id: Uuid, user_id: Uuid, entry_id: Uuid) -> Result<Vec<u8>, AppError> {
        let tenant = self.tenant_service.get_tenant(tenant_id).await?;
        let (detail, accounts) = self
            .journal_service
            .get_entry_with_accounts(tenant_id, user_id, entry_id)
            .await?;

        let data = build_voucher_data(&tenant.name, &detail, &accounts);
        let fonts_dir = self.fonts_dir.clone();

        // Leitura das fontes e layout são bloqueantes
        let pdf = tokio::task::spawn_blocking(move || render_voucher(&fonts_dir, data))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de geração do PDF: {}", e))??;

        tracing::debug!(%tenant_id, %entry_id, bytes = pdf.len(), "Comprovante gerado");
        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            accounts::AccountType,
            journal::{JournalEntry, JournalEntryLine},
        },
        services::journal_service::build_detail,
    };
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn account(code: &str, name: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            parent_id: None,
            code: code.into(),
            name: name.into(),
            account_type: AccountType::Asset,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn entry(is_posted: bool) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            fiscal_year_id: Uuid::new_v4(),
            branch_id: None,
            entry_number: 15,
            entry_date: NaiveDate::from_ymd_opt(2025, 4, 3).unwrap(),
            description: "Compra de material".into(),
            reference: Some("NF 998".into()),
            is_posted,
            posted_at: None,
            posted_by: None,
            reversal_of: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(entry_id: Uuid, account_id: Uuid, debit: Decimal, credit: Decimal, order: i32) -> JournalEntryLine {
        JournalEntryLine {
            id: Uuid::new_v4(),
            journal_entry_id: entry_id,
            account_id,
            description: None,
            debit,
            credit,
            line_order: order,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn voucher_lists_accounts_and_totals() {
        let supplies = account("5.1.01", "Material de escritório");
        let cash = account("1.1.01", "Caixa");
        let e = entry(false);
        let lines = vec![
            line(e.id, supplies.id, dec!(89.9), dec!(0), 0),
            line(e.id, cash.id, dec!(0), dec!(89.90), 1),
        ];
        let detail = build_detail(e, lines);
        let accounts = HashMap::from([(supplies.id, supplies), (cash.id, cash)]);

        let data = build_voucher_data("Alfa Contabilidade", &detail, &accounts);

        assert_eq!(data.title, "LANÇAMENTO CONTÁBIL #15");
        assert_eq!(data.rows[0].account, "5.1.01 - Material de escritório");
        assert_eq!(data.rows[0].debit, "89.90");
        assert_eq!(data.rows[0].credit, "");
        assert_eq!(data.rows[1].credit, "89.90");
        assert_eq!(data.total_debit, "89.90");
        assert!(data.header_lines.contains(&"Referência: NF 998".to_string()));
        assert!(data.header_lines.contains(&"Situação: RASCUNHO".to_string()));
    }

    #[test]
    fn unknown_account_falls_back_to_id() {
        let e = entry(true);
        let orphan = Uuid::new_v4();
        let detail = build_detail(e.clone(), vec![line(e.id, orphan, dec!(1), dec!(0), 0)]);
        let data = build_voucher_data("Alfa", &detail, &HashMap::new());
        assert_eq!(data.rows[0].account, orphan.to_string());
        assert!(data.header_lines.contains(&"Situação: EFETIVADO".to_string()));
    }
}

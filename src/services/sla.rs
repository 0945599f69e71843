// src/services/sla.rs

use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, Utc, Weekday};

use crate::models::application::{Application, Column, LABEL_IN_ANALYSIS};

const HOURS_PER_WEEK: i64 = 7 * 24;
const WEEKDAY_HOURS_PER_WEEK: i64 = 5 * 24;

// Colunas em que o prazo próximo acende o alerta
const FIRE_COLUMNS: [Column; 4] = [
    Column::Received,
    Column::UnderAnalysis,
    Column::Reanalysis,
    Column::Approved,
];

/// Calendário das horas "úteis" do SLA.
///
/// Uma hora conta quando o dia *local* do cursor não é sábado nem domingo.
/// Todas as horas de um dia de semana contam, inclusive a madrugada.
#[derive(Debug, Clone, Copy)]
pub struct BusinessCalendar {
    offset: FixedOffset,
}

impl BusinessCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Constrói a partir de um deslocamento em horas (ex: -3 para Brasília).
    pub fn from_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours * 3600).map(Self::new)
    }

    fn is_weekend(&self, instant: DateTime<Utc>) -> bool {
        matches!(
            instant.with_timezone(&self.offset).weekday(),
            Weekday::Sat | Weekday::Sun
        )
    }

    /// Horas úteis entre `start` e `end`.
    ///
    /// Percorre cursores de hora em hora a partir de `start`, contando cada
    /// cursor estritamente anterior a `end` que cai num dia de semana. Uma hora
    /// final incompleta também conta. Se `end < start` o resultado é zero.
    pub fn business_hours_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
        if end <= start {
            return 0;
        }

        let elapsed = end - start;
        let whole = elapsed.num_hours();
        let steps = if start + Duration::hours(whole) < end { whole + 1 } else { whole };

        // Cada janela de 168 cursores passa exatamente uma vez por cada hora da semana
        let full_weeks = steps / HOURS_PER_WEEK;
        let mut hours = full_weeks * WEEKDAY_HOURS_PER_WEEK;
        let mut cursor = start + Duration::hours(full_weeks * HOURS_PER_WEEK);

        while cursor < end {
            if !self.is_weekend(cursor) {
                hours += 1;
            }
            cursor += Duration::hours(1);
        }
        hours
    }

    /// A ficha estourou o orçamento da coluna atual?
    pub fn is_overdue(
        &self,
        column: Column,
        last_moved_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        match column.sla_hours() {
            Some(budget) => {
                let start = last_moved_at.unwrap_or(created_at);
                self.business_hours_between(start, now) > budget
            }
            None => false,
        }
    }

    pub fn application_overdue(&self, app: &Application, now: DateTime<Utc>) -> bool {
        self.is_overdue(app.column, Some(app.last_moved_at), app.created_at, now)
    }

    /// Prazo nas próximas 24h (e ainda não vencido) numa coluna ativa.
    pub fn is_on_fire(&self, column: Column, deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let until = deadline - now;
        FIRE_COLUMNS.contains(&column) && until >= Duration::zero() && until <= Duration::hours(24)
    }

    /// O prazo cai no mesmo dia local de `now`.
    pub fn is_due_today(&self, deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        deadline.with_timezone(&self.offset).date_naive() == now.with_timezone(&self.offset).date_naive()
    }

    pub fn is_past_deadline(&self, deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        deadline < now
    }

    /// Etiquetas exibidas no cartão: atrasada esconde "Em Análise".
    pub fn display_labels(&self, app: &Application, now: DateTime<Utc>) -> Vec<String> {
        if self.application_overdue(app, now) {
            app.labels
                .iter()
                .filter(|l| l.as_str() != LABEL_IN_ANALYSIS)
                .cloned()
                .collect()
        } else {
            app.labels.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    // Versão direta do laço, usada como referência
    fn naive_count(cal: &BusinessCalendar, start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
        if end < start {
            return 0;
        }
        let mut hours = 0;
        let mut cursor = start;
        while cursor < end {
            if !cal.is_weekend(cursor) {
                hours += 1;
            }
            cursor += Duration::hours(1);
        }
        hours
    }

    #[test]
    fn friday_night_to_monday_counts_two_hours() {
        let cal = BusinessCalendar::utc();
        // 2025-03-07 é sexta-feira
        let start = at(2025, 3, 7, 23, 0);
        let end = at(2025, 3, 10, 1, 0);
        assert_eq!(cal.business_hours_between(start, end), 2);
    }

    #[test]
    fn negative_interval_is_zero() {
        let cal = BusinessCalendar::utc();
        let start = at(2025, 3, 10, 12, 0);
        assert_eq!(cal.business_hours_between(start, start - Duration::hours(5)), 0);
        assert!(!cal.is_overdue(Column::Received, Some(start), start, start - Duration::days(10)));
    }

    #[test]
    fn partial_hour_counts_as_one() {
        let cal = BusinessCalendar::utc();
        let start = at(2025, 3, 10, 10, 0);
        assert_eq!(cal.business_hours_between(start, at(2025, 3, 10, 10, 30)), 1);
        assert_eq!(cal.business_hours_between(start, at(2025, 3, 10, 11, 0)), 1);
        assert_eq!(cal.business_hours_between(start, at(2025, 3, 10, 11, 1)), 2);
    }

    #[test]
    fn week_skipping_matches_hour_by_hour_count() {
        let cal = BusinessCalendar::from_offset_hours(-3).unwrap();
        let start = at(2025, 1, 3, 17, 20);
        for extra in [0, 1, 50, 167, 168, 169, 400, 1000, 2017] {
            let end = start + Duration::hours(extra) + Duration::minutes(13);
            assert_eq!(
                cal.business_hours_between(start, end),
                naive_count(&cal, start, end),
                "extra = {extra}"
            );
        }
    }

    #[test]
    fn weekend_is_evaluated_in_local_offset() {
        // Sábado 01:00 UTC ainda é sexta 22:00 em UTC-3
        let start = at(2025, 3, 8, 1, 0);
        let end = at(2025, 3, 8, 2, 0);
        assert_eq!(BusinessCalendar::utc().business_hours_between(start, end), 0);
        let brt = BusinessCalendar::from_offset_hours(-3).unwrap();
        assert_eq!(brt.business_hours_between(start, end), 1);
    }

    #[test]
    fn thirty_weekday_hours_in_received_is_overdue() {
        let cal = BusinessCalendar::utc();
        // Segunda 08:00 + 30h = Terça 14:00
        let t0 = at(2025, 3, 10, 8, 0);
        let now = t0 + Duration::hours(30);
        assert!(cal.is_overdue(Column::Received, Some(t0), t0, now));
        assert!(cal.is_overdue(Column::UnderAnalysis, Some(t0), t0, now));
        assert!(!cal.is_overdue(Column::Reanalysis, Some(t0), t0, now));
        assert!(!cal.is_overdue(Column::Approved, Some(t0), t0, now));
    }

    #[test]
    fn thresholds_are_strict() {
        let cal = BusinessCalendar::utc();
        let t0 = at(2025, 3, 10, 0, 0);
        assert!(!cal.is_overdue(Column::Received, Some(t0), t0, t0 + Duration::hours(24)));
        assert!(cal.is_overdue(Column::Received, Some(t0), t0, t0 + Duration::hours(25)));
        assert!(!cal.is_overdue(Column::Reanalysis, Some(t0), t0, t0 + Duration::hours(48)));
        assert!(cal.is_overdue(Column::Reanalysis, Some(t0), t0, t0 + Duration::hours(49)));
    }

    #[test]
    fn falls_back_to_created_at() {
        let cal = BusinessCalendar::utc();
        let created = at(2025, 3, 10, 0, 0);
        let now = created + Duration::hours(30);
        assert!(cal.is_overdue(Column::Received, None, created, now));
        // Resultado estável entre chamadas
        assert_eq!(
            cal.is_overdue(Column::Received, None, created, now),
            cal.is_overdue(Column::Received, None, created, now)
        );
    }

    #[test]
    fn finalized_never_overdue() {
        let cal = BusinessCalendar::utc();
        let t0 = at(2024, 1, 1, 0, 0);
        assert!(!cal.is_overdue(Column::Finalized, Some(t0), t0, t0 + Duration::days(400)));
        assert!(!cal.is_overdue(Column::DeniedWithFee, Some(t0), t0, t0 + Duration::days(400)));
    }

    #[test]
    fn on_fire_window() {
        let cal = BusinessCalendar::utc();
        let now = at(2025, 3, 10, 12, 0);
        assert!(cal.is_on_fire(Column::UnderAnalysis, now + Duration::hours(5), now));
        assert!(!cal.is_on_fire(Column::UnderAnalysis, now + Duration::hours(25), now));
        assert!(!cal.is_on_fire(Column::UnderAnalysis, now - Duration::minutes(1), now));
        assert!(!cal.is_on_fire(Column::Finalized, now + Duration::hours(5), now));
    }

    #[test]
    fn due_today_uses_local_date() {
        let brt = BusinessCalendar::from_offset_hours(-3).unwrap();
        let now = at(2025, 3, 10, 12, 0);
        // 02:00 UTC do dia 11 ainda é dia 10 em UTC-3
        assert!(brt.is_due_today(at(2025, 3, 11, 2, 0), now));
        assert!(!BusinessCalendar::utc().is_due_today(at(2025, 3, 11, 2, 0), now));
    }
}

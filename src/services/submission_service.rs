// src/services/submission_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        catalog::resolve_student,
        schedule::{teacher_ref, NewSchedule, NewSession, SessionUpdate},
        wizard::{WizardState, WizardStep, WizardVariant},
    },
    services::backend::Backend,
};
use std::collections::BTreeMap;

const NEW_SESSION_PAYMENT: &str = "pending";
const NEW_SESSION_STATUS: &str = "active";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub sessions_created: usize,
    pub sessions_reused: usize,
    pub schedules_created: usize,
}

/// Sequência de confirmação:
/// 1. uma sessão por aluno (ou atualização da sessão existente nos modos atribuir/trocar)
/// 2. pacote marcado como resgatado, se for o caso
/// 3. todas as linhas num único `POST schedules/bulk`
///
/// O mapa aluno -> sessão fica guardado no estado antes do passo 3, por isso
/// repetir a confirmação depois de uma falha reaproveita as sessões já criadas.
pub async fn submit<B: Backend>(backend: &B, state: &mut WizardState) -> AppResult<SubmissionReport> {
    if state.step != WizardStep::Confirm {
        return Err(AppError::WrongStep { expected: WizardStep::Confirm, actual: state.step });
    }
    let course = state
        .course
        .clone()
        .ok_or_else(|| AppError::Validation("Please select a course.".into()))?;
    let class_option_id = state
        .class_schedule
        .as_ref()
        .map(|s| s.class_option.id)
        .ok_or_else(|| AppError::Validation("Please select a class type.".into()))?;
    let teacher = state
        .teacher_data
        .clone()
        .ok_or_else(|| AppError::Validation("Please select a teacher.".into()))?;

    let mut report = SubmissionReport { sessions_created: 0, sessions_reused: 0, schedules_created: 0 };

    // --- 1. Sessões ---
    let session_map: BTreeMap<String, i64> = match state.variant.existing_session() {
        Some(existing) => {
            let update = SessionUpdate {
                course_id: course.id,
                teacher_id: teacher_ref(teacher.teacher_id),
                class_option_id,
            };
            backend.update_session(existing.id, &update).await?;
            tracing::info!("Sessão {} atualizada ({})", existing.id, state.variant.label());
            state.students.iter().map(|s| (s.id.clone(), existing.id)).collect()
        }
        None => {
            let package_id = match &state.variant {
                WizardVariant::PackageRedemption { package } => Some(package.id),
                _ => None,
            };
            for student in &state.students {
                if let Some(session_id) = state.created_sessions.get(&student.id) {
                    tracing::info!("Reaproveitando sessão {} do aluno {}", session_id, student.id);
                    report.sessions_reused += 1;
                    continue;
                }
                let new_session = NewSession {
                    student_id: student.id.clone(),
                    course_id: course.id,
                    teacher_id: teacher_ref(teacher.teacher_id),
                    class_option_id,
                    class_cancel: 0,
                    payment: NEW_SESSION_PAYMENT.to_string(),
                    status: NEW_SESSION_STATUS.to_string(),
                    is_from_package: package_id.map(|_| true),
                    package_id,
                };
                let created = backend.create_session(&new_session).await?;
                tracing::debug!("Sessão {} criada para o aluno {}", created.id, student.id);
                state.created_sessions.insert(student.id.clone(), created.id);
                report.sessions_created += 1;
            }
            state.created_sessions.clone()
        }
    };

    // --- 2. Pacote ---
    if let WizardVariant::PackageRedemption { package } = &state.variant {
        if !state.package_applied {
            backend.apply_package(package.id, course.id).await?;
            state.package_applied = true;
            tracing::info!("Pacote {} resgatado no curso {}", package.id, course.id);
        }
    }

    // --- 3. Linhas ---
    let mut payloads = Vec::with_capacity(state.rows.len());
    for row in &state.rows {
        let student = resolve_student(&state.students, &row.student).ok_or_else(|| {
            AppError::Validation(format!("Unknown student '{}' in class {}.", row.student, row.class_number))
        })?;
        let session_id = *session_map.get(&student.id).ok_or_else(|| {
            AppError::Validation(format!("No session was created for {}.", student.display_name()))
        })?;
        payloads.push(NewSchedule {
            session_id,
            course_id: course.id,
            student_id: student.id.clone(),
            teacher_id: teacher_ref(row.teacher_id),
            date: row.date.format("%Y-%m-%d").to_string(),
            start_time: row.time.start_label(),
            end_time: row.time.end_label(),
            room: row.room.clone(),
            remark: row.remark.clone(),
            attendance: row.attendance,
            feedback: String::new(),
            verify_fb: false,
            class_number: row.class_number,
            warning: row.warning.clone(),
        });
    }

    if !payloads.is_empty() {
        let created = backend.create_schedules(&payloads).await?;
        report.schedules_created = created.created;
    }

    tracing::info!(
        "Confirmação {}: {} sessão(ões) novas, {} reaproveitadas, {} aulas",
        state.run_id,
        report.sessions_created,
        report.sessions_reused,
        report.schedules_created
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        catalog::{ClassOption, Course, ExistingSession, Package, Student},
        schedule::{Attendance, ClassSchedule, DaySelection, ScheduleRow, TeacherData, TimeRange},
    };
    use crate::services::testing::{Call, MockBackend};
    use chrono::{NaiveDate, NaiveTime, Weekday};

    fn students() -> Vec<Student> {
        vec![
            Student { id: "a".into(), name: "Alice".into(), nickname: Some("Ali".into()) },
            Student { id: "b".into(), name: "Bruno".into(), nickname: None },
        ]
    }

    fn row(student: &str, day: u32, class_number: u32) -> ScheduleRow {
        ScheduleRow {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            time: TimeRange::parse("10:00 - 11:00").unwrap(),
            student: student.into(),
            teacher: "Ms Lee".into(),
            teacher_id: 7,
            room: "R1".into(),
            remark: "hi".into(),
            warning: if day == 10 { "Room conflict with Math".into() } else { String::new() },
            attendance: Attendance::Pending,
            class_number,
        }
    }

    fn confirm_state(variant: WizardVariant) -> WizardState {
        let clock = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        WizardState {
            step: WizardStep::Confirm,
            variant,
            course: Some(Course { id: 3, title: "Math".into() }),
            class_schedule: Some(ClassSchedule::new(
                ClassOption { id: 1, class_mode: "12 times fixed".into(), class_limit: 4, tuition_fee: 0.0 },
                DaySelection::Fixed { days: vec![Weekday::Wed], start_time: clock(10), end_time: clock(11) },
            )),
            teacher_data: Some(TeacherData {
                teacher: "Ms Lee".into(),
                teacher_id: 7,
                room: "R1".into(),
                remark: String::new(),
            }),
            students: students(),
            rows: vec![
                row("Ali", 10, 1),
                row("Ali", 17, 2),
                row("Ali", 24, 3),
                row("Bruno", 10, 1),
                row("Bruno", 17, 2),
            ],
            ..Default::default()
        }
    }

    fn bulk_payload(backend: &MockBackend) -> Vec<NewSchedule> {
        backend
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateSchedules(p) => Some(p),
                _ => None,
            })
            .last()
            .expect("bulk call")
    }

    #[tokio::test]
    async fn one_session_per_student_and_one_bulk_call() {
        let backend = MockBackend::default();
        let mut state = confirm_state(WizardVariant::NewEnrollment);

        let report = submit(&backend, &mut state).await.unwrap();

        let calls = backend.calls();
        let sessions: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                Call::CreateSession(s) => Some(s.student_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(sessions, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(calls.iter().filter(|c| matches!(c, Call::CreateSchedules(_))).count(), 1);

        let payload = bulk_payload(&backend);
        assert_eq!(payload.len(), 5);
        let session_a = state.created_sessions["a"];
        let session_b = state.created_sessions["b"];
        assert_ne!(session_a, session_b);
        for entry in &payload {
            let expected = if entry.student_id == "a" { session_a } else { session_b };
            assert_eq!(entry.session_id, expected);
            assert_eq!(entry.attendance, Attendance::Pending);
            assert_eq!(entry.feedback, "");
            assert!(!entry.verify_fb);
            assert_eq!(entry.start_time, "10:00");
            assert_eq!(entry.end_time, "11:00");
        }
        assert_eq!(payload.iter().filter(|p| p.student_id == "a").count(), 3);
        assert_eq!(payload[0].warning, "Room conflict with Math");
        assert_eq!(payload[1].warning, "");
        assert_eq!(report, SubmissionReport { sessions_created: 2, sessions_reused: 0, schedules_created: 5 });
    }

    #[tokio::test]
    async fn retry_after_failure_reuses_created_sessions() {
        let backend = MockBackend::default();
        *backend.fail_session_for.lock().unwrap() = Some("b".into());
        let mut state = confirm_state(WizardVariant::NewEnrollment);

        assert!(submit(&backend, &mut state).await.is_err());
        assert_eq!(state.created_sessions.len(), 1);
        assert!(!backend.calls().iter().any(|c| matches!(c, Call::CreateSchedules(_))));

        *backend.fail_session_for.lock().unwrap() = None;
        let report = submit(&backend, &mut state).await.unwrap();

        assert_eq!(report.sessions_reused, 1);
        assert_eq!(report.sessions_created, 1);
        let created_for_a = backend
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::CreateSession(s) if s.student_id == "a"))
            .count();
        assert_eq!(created_for_a, 1);
    }

    #[tokio::test]
    async fn bulk_failure_surfaces_one_error_and_keeps_sessions() {
        let backend = MockBackend::default();
        backend.set(&backend.fail_bulk, true);
        let mut state = confirm_state(WizardVariant::NewEnrollment);

        let result = submit(&backend, &mut state).await;

        assert!(matches!(result, Err(AppError::Backend(_))));
        assert_eq!(state.created_sessions.len(), 2);
        assert_eq!(state.step, WizardStep::Confirm);
    }

    #[tokio::test]
    async fn assign_mode_updates_the_existing_session() {
        let backend = MockBackend::default();
        let session = ExistingSession {
            id: 900,
            student_id: "a".into(),
            course_id: 0,
            course_title: "TBC".into(),
            teacher_id: None,
            class_option_id: 1,
        };
        let mut state = confirm_state(WizardVariant::CourseAssignment { session });

        submit(&backend, &mut state).await.unwrap();

        let calls = backend.calls();
        assert!(!calls.iter().any(|c| matches!(c, Call::CreateSession(_))));
        assert!(matches!(&calls[0], Call::UpdateSession(900, u) if u.course_id == 3 && u.teacher_id == Some(7)));
        assert!(bulk_payload(&backend).iter().all(|p| p.session_id == 900));
    }

    #[tokio::test]
    async fn package_redemption_marks_sessions_and_applies_package_once() {
        let backend = MockBackend::default();
        let package = Package {
            id: 55,
            student_id: "a".into(),
            class_option_id: 2,
            class_mode: "12 times check".into(),
            class_limit: 1,
            tuition_fee: 0.0,
        };
        let mut state = confirm_state(WizardVariant::PackageRedemption { package: package.clone() });
        state.students.truncate(1);
        state.rows.clear();
        state.class_schedule = Some(ClassSchedule::open(package.class_option()));
        state.teacher_data = Some(TeacherData::tbd());

        submit(&backend, &mut state).await.unwrap();
        submit(&backend, &mut state).await.unwrap();

        let calls = backend.calls();
        match &calls[0] {
            Call::CreateSession(s) => {
                assert_eq!(s.package_id, Some(55));
                assert_eq!(s.is_from_package, Some(true));
                assert_eq!(s.teacher_id, None);
                assert_eq!(s.class_option_id, 2);
            }
            other => panic!("unexpected call {:?}", other),
        }
        assert_eq!(calls.iter().filter(|c| matches!(c, Call::ApplyPackage(55, 3))).count(), 1);
        assert_eq!(calls.iter().filter(|c| matches!(c, Call::CreateSession(_))).count(), 1);
        // sem linhas não há pedido em lote
        assert!(!calls.iter().any(|c| matches!(c, Call::CreateSchedules(_))));
    }

    #[tokio::test]
    async fn submit_outside_confirm_is_rejected() {
        let backend = MockBackend::default();
        let mut state = confirm_state(WizardVariant::NewEnrollment);
        state.step = WizardStep::Teacher;
        assert!(matches!(submit(&backend, &mut state).await, Err(AppError::WrongStep { .. })));
        assert!(backend.calls().is_empty());
    }
}

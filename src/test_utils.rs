use crate::models::domain::{Answer, Course, Lesson, Question, Quiz, User, UserRole};

pub mod fixtures {
    use super::*;

    pub fn teacher() -> User {
        User::new("teacher", "hash", UserRole::Teacher)
    }

    pub fn student_named(username: &str) -> User {
        User::new(username, "hash", UserRole::Student)
    }

    /// A course owned by `teacher_id` with the given students enrolled.
    pub fn course_with_students(teacher_id: &str, student_ids: &[&str]) -> Course {
        let mut course = Course::new("Test course", None, teacher_id);
        course.student_ids = student_ids.iter().map(|id| id.to_string()).collect();
        course
    }

    pub fn lesson_in(course: &Course, order: i32) -> Lesson {
        Lesson::new(&course.id, &format!("Lesson {}", order), "content", order)
    }

    /// A quiz with `questions` questions, each with one correct answer first.
    pub fn quiz_for(lesson: &Lesson, questions: usize) -> Quiz {
        let mut quiz = Quiz::new(&lesson.id, "Test quiz");
        quiz.questions = (1..=questions)
            .map(|n| {
                Question::new(
                    &format!("Question {}", n),
                    vec![Answer::new("right", true), Answer::new("wrong", false)],
                )
            })
            .collect();
        quiz
    }
}

pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_fixtures_build_a_consistent_catalog() {
        let teacher = teacher();
        let student = student_named("mykola");
        let course = course_with_students(&teacher.id, &[&student.id]);
        let lesson = lesson_in(&course, 1);
        let quiz = quiz_for(&lesson, 3);

        assert!(course.is_owned_by(&teacher.id));
        assert!(course.is_enrolled(&student.id));
        assert_eq!(lesson.course_id, course.id);
        assert_eq!(quiz.lesson_id, lesson.id);
        assert_eq!(quiz.questions.len(), 3);
        assert!(quiz.questions.iter().all(|q| q.correct_answer().is_some()));
    }
}
